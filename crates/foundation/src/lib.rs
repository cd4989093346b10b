pub mod date;
pub mod geo;

// Foundation crate: small, well-tested primitives only.
pub use date::*;
pub use geo::*;
