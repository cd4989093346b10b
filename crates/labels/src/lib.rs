//! User-placed map labels: the record format, a JSON-file store, an HTTP
//! client for that store, and downloadable snapshots.

pub mod client;
pub mod error;
pub mod record;
pub mod snapshot;
pub mod store;

pub use client::*;
pub use error::*;
pub use record::*;
pub use snapshot::*;
pub use store::*;
