//! View-state orchestration: which layers are on the map, at what zoom cap,
//! for which date, and how that is mirrored into the shareable URL.

pub mod compare;
pub mod playback;
pub mod session;
pub mod settle;

pub use compare::*;
pub use playback::*;
pub use session::*;
pub use settle::*;
