//! The shareable view: what is on screen and how it is written to a URL.

pub mod codec;
pub mod state;

pub use codec::*;
pub use state::*;
