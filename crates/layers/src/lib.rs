pub mod headless;
pub mod layer;
pub mod map;
pub mod raster;
pub mod tile;

pub use headless::*;
pub use layer::*;
pub use map::*;
pub use raster::*;
pub use tile::*;
