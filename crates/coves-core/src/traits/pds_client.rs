//! The PDS client capability set.
//!
//! A `PdsClient` exposes the narrow set of repo-RPC primitives this
//! subsystem consumes against the *authenticated user's own* PDS. Two
//! implementations exist, proof-of-possession OAuth and static bearer
//! token, selected at construction; the vote service, locator, cache, and
//! joiner are written against this trait and never branch on which
//! implementation is active.

use async_trait::async_trait;

use crate::error::PdsError;
use crate::repo::{ListRecordsOutput, VoteRecordValue};
use crate::types::{AtUri, Did, Nsid};

/// Output from a successful `createRecord` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRecord {
    pub uri: AtUri,
    pub cid: String,
}

/// A PDS client authenticated as a single user.
#[async_trait]
pub trait PdsClient: Send + Sync {
    /// The DID this client is authenticated as.
    fn did(&self) -> &Did;

    /// The base URL of the PDS this client talks to.
    fn host_url(&self) -> &str;

    /// `com.atproto.repo.createRecord`. If `rkey` is `None` the PDS
    /// assigns one.
    async fn create_record(
        &self,
        collection: &Nsid,
        rkey: Option<&str>,
        record: &VoteRecordValue,
    ) -> Result<CreatedRecord, PdsError>;

    /// `com.atproto.repo.deleteRecord`. Idempotent from the caller's
    /// perspective, but returns [`PdsError::NotFound`] if the record is
    /// already absent; callers treat this as a signal, not a fatal error.
    async fn delete_record(&self, collection: &Nsid, rkey: &str) -> Result<(), PdsError>;

    /// `com.atproto.repo.listRecords`, newest-first. The core always
    /// calls this with `reverse=true` and `limit=100`.
    async fn list_records(
        &self,
        collection: &Nsid,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<ListRecordsOutput, PdsError>;
}
