//! The Vote Write/Toggle Subsystem.
//!
//! Four components sit on top of the `PdsClient` contract in `coves-core`:
//!
//! - [`cache`]: the per-user, TTL-bounded vote cache.
//! - [`locator`]: finds a user's prior vote on a subject without trusting
//!   an eventually consistent secondary index.
//! - [`service`]: the only write path for vote records: create/delete with
//!   toggle semantics.
//! - [`joiner`]: batch viewer-state hydration for feed endpoints.

pub mod cache;
pub mod config;
pub mod error;
pub mod joiner;
pub mod locator;
pub mod service;

pub use cache::{CachedVote, VoteCache};
pub use config::VoteCacheConfig;
pub use error::VoteError;
pub use joiner::ViewerStateJoiner;
pub use locator::VoteLocator;
pub use service::{CreateVoteOutcome, SubjectInput, VoteService};

/// Convenience alias for `coves-votes` operations.
pub type Result<T> = std::result::Result<T, VoteError>;
