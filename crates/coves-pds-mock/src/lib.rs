//! An in-memory [`PdsClient`](coves_core::traits::PdsClient) implementation,
//! used by `coves-votes`'s test suite and by `votectl`'s offline mode.
//!
//! A fast, dependency-free stand-in for a real repo that still exercises
//! the exact `PdsClient` contract (create/delete/list, newest-first
//! ordering, 404-on-missing-delete, paginated listing with a cursor) that
//! the vote subsystem is written against.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, instrument};

use coves_core::error::PdsError;
use coves_core::repo::{ListRecordsOutput, Record, VoteRecordValue};
use coves_core::traits::{CreatedRecord, PdsClient};
use coves_core::types::{AtUri, Did, Nsid, PdsUrl, Rkey, TidGenerator};

#[derive(Clone)]
struct StoredRecord {
    rkey: Rkey,
    cid: String,
    value: serde_json::Value,
}

/// An in-memory PDS client authenticated as a single (synthetic) user.
///
/// All state lives behind a `Mutex<HashMap<Nsid, Vec<StoredRecord>>>` keyed
/// by collection, stored newest-first (new records are pushed to the front)
/// so `list_records` never has to sort.
pub struct MockPdsClient {
    did: Did,
    pds: PdsUrl,
    collections: Mutex<HashMap<Nsid, Vec<StoredRecord>>>,
    tids: TidGenerator,
}

impl MockPdsClient {
    /// Construct an empty mock PDS for `did`.
    ///
    /// `pds` is cosmetic (no network calls are ever made) but is kept so
    /// callers constructing a `MockPdsClient` in place of a network client
    /// don't need a different code path to obtain a `host_url()`.
    pub fn new(did: Did, pds: PdsUrl) -> Self {
        Self {
            did,
            pds,
            collections: Mutex::new(HashMap::new()),
            tids: TidGenerator::new(),
        }
    }

    /// Construct an empty mock PDS for `did` with a placeholder host URL.
    pub fn for_did(did: Did) -> Self {
        Self::new(did, PdsUrl::new("http://localhost:2583").expect("valid localhost PDS url"))
    }

    /// Directly seed a record into the store, bypassing `create_record`.
    /// Useful for tests that want pre-existing PDS state.
    pub fn seed(&self, collection: &Nsid, rkey: &str, record: &VoteRecordValue) -> AtUri {
        let rkey = Rkey::new(rkey).expect("valid rkey");
        let uri = AtUri::from_parts(self.did.clone(), collection.clone(), rkey.clone());
        let cid = generate_cid(&record.to_json().to_string());
        let mut collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        collections
            .entry(collection.clone())
            .or_default()
            .insert(0, StoredRecord {
                rkey,
                cid,
                value: record.to_json(),
            });
        uri
    }

    /// The number of live records in `collection`, for test assertions.
    pub fn count(&self, collection: &Nsid) -> usize {
        let collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        collections.get(collection).map(|v| v.len()).unwrap_or(0)
    }
}

fn generate_cid(content: &str) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("bafyreimock{:016x}", hasher.finish())
}

#[async_trait]
impl PdsClient for MockPdsClient {
    fn did(&self) -> &Did {
        &self.did
    }

    fn host_url(&self) -> &str {
        self.pds.as_str()
    }

    #[instrument(skip(self, record))]
    async fn create_record(
        &self,
        collection: &Nsid,
        rkey: Option<&str>,
        record: &VoteRecordValue,
    ) -> Result<CreatedRecord, PdsError> {
        let rkey = match rkey {
            Some(r) => Rkey::new(r)
                .map_err(|e| PdsError::BadRequest(format!("invalid rkey: {e}")))?,
            None => self.tids.next(),
        };

        let value = record.to_json();
        let cid = generate_cid(&value.to_string());
        let uri = AtUri::from_parts(self.did.clone(), collection.clone(), rkey.clone());

        let mut collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        collections
            .entry(collection.clone())
            .or_default()
            .insert(0, StoredRecord { rkey, cid: cid.clone(), value });

        debug!(uri = %uri, "mock: created record");
        Ok(CreatedRecord { uri, cid })
    }

    #[instrument(skip(self))]
    async fn delete_record(&self, collection: &Nsid, rkey: &str) -> Result<(), PdsError> {
        let mut collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        let records = collections
            .get_mut(collection)
            .ok_or(PdsError::NotFound)?;

        let before = records.len();
        records.retain(|r| r.rkey.as_str() != rkey);

        if records.len() == before {
            return Err(PdsError::NotFound);
        }

        debug!(collection = %collection, rkey, "mock: deleted record");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_records(
        &self,
        collection: &Nsid,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<ListRecordsOutput, PdsError> {
        let collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        let records = collections.get(collection).cloned().unwrap_or_default();

        let start = match cursor {
            Some(c) => records
                .iter()
                .position(|r| r.rkey.as_str() == c)
                .map(|idx| idx + 1)
                .unwrap_or(records.len()),
            None => 0,
        };

        let limit = limit.max(1) as usize;
        let page: Vec<_> = records.iter().skip(start).take(limit).cloned().collect();
        let next_cursor = if start + page.len() < records.len() {
            page.last().map(|r| r.rkey.as_str().to_string())
        } else {
            None
        };

        let out = page
            .into_iter()
            .map(|r| Record {
                uri: AtUri::from_parts(self.did.clone(), collection.clone(), r.rkey),
                cid: r.cid,
                value: r.value,
            })
            .collect();

        Ok(ListRecordsOutput {
            records: out,
            cursor: next_cursor,
        })
    }
}
