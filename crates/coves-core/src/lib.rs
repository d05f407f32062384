//! Core AT Protocol value types, error taxonomies, wire types, and the
//! `PdsClient` capability trait shared by every crate in the vote
//! subsystem.

pub mod error;
pub mod repo;
pub mod traits;
pub mod types;

pub use error::Error;
pub use types::{AtUri, Did, Nsid, PdsUrl, Rkey, TidGenerator};

/// Convenience alias for `coves-core` operations.
pub type Result<T> = std::result::Result<T, Error>;
