//! Error types shared by the vote subsystem and its PDS client contract.
//!
//! Two closed taxonomies live here: [`InvalidInputError`] for malformed
//! value types (DIDs, NSIDs, AT-URIs, ...) and [`PdsError`] for the outcome
//! of a repo-RPC call against a remote PDS. Callers are expected to
//! match on variants, never on the `Display` string.

use std::fmt;
use thiserror::Error;

/// The unified error type for `coves-core` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A value type failed validation at construction.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// A PDS repo-RPC call failed.
    #[error("pds error: {0}")]
    Pds(#[from] PdsError),
}

/// Input validation errors raised when constructing a core value type.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid DID format.
    #[error("invalid DID '{value}': {reason}")]
    Did { value: String, reason: String },

    /// Invalid NSID format.
    #[error("invalid NSID '{value}': {reason}")]
    Nsid { value: String, reason: String },

    /// Invalid AT URI format.
    #[error("invalid AT URI '{value}': {reason}")]
    AtUri { value: String, reason: String },

    /// Invalid PDS URL format.
    #[error("invalid PDS URL '{value}': {reason}")]
    PdsUrl { value: String, reason: String },

    /// Invalid record key format.
    #[error("invalid rkey '{value}': {reason}")]
    Rkey { value: String, reason: String },

    /// Generic invalid input, used for JSON (de)serialization failures.
    #[error("invalid input: {message}")]
    Other { message: String },
}

/// The outcome of a repo-RPC call against a remote PDS.
///
/// This is a closed set, not a string; dispatch on it with `matches!` or
/// `==`, never by inspecting [`Display`](fmt::Display) output.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PdsError {
    /// HTTP 401. The access token is missing, expired, or rejected.
    #[error("unauthorized")]
    Unauthorized,

    /// HTTP 403. The caller is authenticated but not permitted.
    #[error("forbidden")]
    Forbidden,

    /// HTTP 404. The targeted record does not exist.
    #[error("not found")]
    NotFound,

    /// HTTP 400. The request was malformed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// HTTP 409. A swap precondition or uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// HTTP 413. The record body exceeded the PDS's size limit.
    #[error("payload too large")]
    PayloadTooLarge,

    /// HTTP 429. The caller is being rate limited.
    #[error("rate limited")]
    RateLimited,

    /// Any other failure: 5xx, transport errors, or an unrecognized status.
    #[error("pds unavailable: {0}")]
    Other(String),
}

impl PdsError {
    /// Classify an HTTP status code plus an optional server-provided message
    /// into the closed taxonomy above.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => PdsError::Unauthorized,
            403 => PdsError::Forbidden,
            404 => PdsError::NotFound,
            400 => PdsError::BadRequest(message),
            409 => PdsError::Conflict(message),
            413 => PdsError::PayloadTooLarge,
            429 => PdsError::RateLimited,
            _ => PdsError::Other(message),
        }
    }

    /// True for `Unauthorized | Forbidden`, the caller should force
    /// re-authentication rather than retry as-is.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, PdsError::Unauthorized | PdsError::Forbidden)
    }

    /// True for `NotFound`, used by the vote service and the locator to
    /// treat a missing record as a signal rather than a fatal error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PdsError::NotFound)
    }
}

/// Free function equivalent to [`PdsError::is_auth_error`], for call sites
/// that prefer a function over a method.
pub fn is_auth_error(err: &PdsError) -> bool {
    err.is_auth_error()
}

impl fmt::Display for InvalidInputErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Discriminant-only view of [`InvalidInputError`], useful for tests that
/// want to assert on the error's kind without matching the full struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidInputErrorKind {
    Did,
    Nsid,
    AtUri,
    PdsUrl,
    Rkey,
    Other,
}

impl InvalidInputError {
    /// Returns this error's discriminant.
    pub fn kind(&self) -> InvalidInputErrorKind {
        match self {
            InvalidInputError::Did { .. } => InvalidInputErrorKind::Did,
            InvalidInputError::Nsid { .. } => InvalidInputErrorKind::Nsid,
            InvalidInputError::AtUri { .. } => InvalidInputErrorKind::AtUri,
            InvalidInputError::PdsUrl { .. } => InvalidInputErrorKind::PdsUrl,
            InvalidInputError::Rkey { .. } => InvalidInputErrorKind::Rkey,
            InvalidInputError::Other { .. } => InvalidInputErrorKind::Other,
        }
    }
}
