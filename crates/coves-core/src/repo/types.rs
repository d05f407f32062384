//! Repository operation types shared by every `PdsClient` implementation.

use serde::{Deserialize, Serialize};

use crate::types::AtUri;

/// A record read back from a repository, as returned by `getRecord` or
/// `listRecords`.
#[derive(Debug, Clone)]
pub struct Record {
    /// The AT URI of this record.
    pub uri: AtUri,

    /// The CID (content identifier) of this record.
    pub cid: String,

    /// The decoded record body as raw JSON.
    ///
    /// Schema-agnostic beyond requiring a JSON object; interpretation
    /// (e.g. as a [`VoteRecordValue`](crate::repo::VoteRecordValue)) is left
    /// to the caller.
    pub value: serde_json::Value,
}

/// Output from listing records in a collection via `listRecords`.
#[derive(Debug, Clone)]
pub struct ListRecordsOutput {
    /// The records in this page, newest-first.
    pub records: Vec<Record>,

    /// Cursor for the next page. Absent marks end of stream.
    pub cursor: Option<String>,
}

/// A strong reference pinning both the location and content of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrongRef {
    /// The AT URI of the referenced record.
    pub uri: AtUri,
    /// The CID of the referenced record at the moment it was observed.
    pub cid: String,
}
