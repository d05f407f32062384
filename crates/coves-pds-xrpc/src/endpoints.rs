//! XRPC endpoint names and request/response wire shapes for the three
//! repo-RPCs this subsystem consumes.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};

/// com.atproto.repo.createRecord
pub const CREATE_RECORD: &str = "com.atproto.repo.createRecord";

/// com.atproto.repo.deleteRecord
pub const DELETE_RECORD: &str = "com.atproto.repo.deleteRecord";

/// com.atproto.repo.listRecords
pub const LIST_RECORDS: &str = "com.atproto.repo.listRecords";

/// Request body for createRecord.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest<'a> {
    pub repo: &'a str,
    pub collection: &'a str,
    pub record: &'a serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rkey: Option<&'a str>,
}

/// Response from createRecord.
#[derive(Debug, Deserialize)]
pub struct CreateRecordResponse {
    pub uri: String,
    pub cid: String,
}

/// Request body for deleteRecord.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRecordRequest<'a> {
    pub repo: &'a str,
    pub collection: &'a str,
    pub rkey: &'a str,
}

/// Query parameters for listRecords.
#[derive(Debug, Serialize)]
pub struct ListRecordsQuery<'a> {
    pub repo: &'a str,
    pub collection: &'a str,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<&'a str>,
    pub reverse: bool,
}

/// Response from listRecords.
#[derive(Debug, Deserialize)]
pub struct ListRecordsResponse {
    pub records: Vec<RecordEntry>,
    #[serde(default)]
    pub cursor: Option<String>,
}

/// A single record entry from listRecords.
#[derive(Debug, Deserialize)]
pub struct RecordEntry {
    pub uri: String,
    pub cid: String,
    pub value: serde_json::Value,
}

/// XRPC error response body.
#[derive(Debug, Deserialize, Default)]
pub struct XrpcErrorResponse {
    pub error: Option<String>,
    pub message: Option<String>,
}
