//! The closed error taxonomy emitted by the vote subsystem.
//!
//! Ordered from client-fault to infra-fault. Every call site that needs to
//! branch on one of these dispatches by variant, never by matching
//! `Display` output.

use thiserror::Error;

use coves_core::error::PdsError;
use coves_core::types::AtUri;

/// An error surfaced by `CreateVote`, `DeleteVote`, `ensureCachePopulated`,
/// or `getViewerVotesForSubjects`.
#[derive(Debug, Error)]
pub enum VoteError {
    /// `direction` was not `"up"` or `"down"`.
    #[error("direction must be 'up' or 'down'")]
    InvalidDirection,

    /// `subject.uri` was absent/malformed, or (for `CreateVote`)
    /// `subject.cid` was absent.
    #[error("invalid subject: {0}")]
    InvalidSubject(String),

    /// `DeleteVote` was called but the user has no live vote on the
    /// subject.
    #[error("no prior vote to delete")]
    VoteNotFound,

    /// A PDS call returned 401/403. The caller should force re-auth rather
    /// than retry as-is.
    #[error("not authorized")]
    NotAuthorized,

    /// The delete leg of a direction flip succeeded but the create leg
    /// failed. The cache already reflects the deletion; retrying the
    /// original request is safe; it will take the "absent" branch.
    #[error("flip left no vote in place: deleted {deleted} but failed to create the replacement: {source}")]
    PartialFlip {
        /// The AT URI of the vote record that was successfully deleted.
        deleted: AtUri,
        /// The underlying failure from the create leg.
        #[source]
        source: PdsError,
    },

    /// Any other PDS transport or 5xx failure. Transient.
    #[error("pds unavailable: {0}")]
    PdsUnavailable(#[source] PdsError),

    /// The caller's deadline or explicit cancellation fired during a PDS
    /// call or a cache walk.
    #[error("cancelled")]
    Cancelled,
}

impl VoteError {
    /// Classify a raw [`PdsError`] the way every PDS-call boundary in this
    /// crate does: auth failures become [`VoteError::NotAuthorized`],
    /// everything else becomes [`VoteError::PdsUnavailable`].
    ///
    /// Callers that need to treat `NotFound` specially (delete semantics)
    /// must check for it before reaching for this helper.
    pub fn from_pds(err: PdsError) -> Self {
        if err.is_auth_error() {
            VoteError::NotAuthorized
        } else {
            VoteError::PdsUnavailable(err)
        }
    }
}
