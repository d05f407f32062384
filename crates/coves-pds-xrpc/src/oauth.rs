//! The proof-of-possession OAuth [`PdsClient`](coves_core::traits::PdsClient)
//! implementation: every request carries a `DPoP` proof JWT bound to this
//! session's keypair, with the nonce-challenge retry-once handshake RFC 9449
//! requires.

use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use coves_core::error::PdsError;
use coves_core::repo::{ListRecordsOutput, Record, VoteRecordValue};
use coves_core::traits::{CreatedRecord, PdsClient};
use coves_core::types::{AtUri, Did, Nsid, PdsUrl};

use crate::dpop::DpopKey;
use crate::endpoints::*;
use crate::transport::{self, XrpcTransport};

struct DpopState {
    access_token: String,
    nonce: Option<String>,
}

/// A PDS client authenticated via proof-of-possession OAuth.
pub struct OAuthPdsClient {
    did: Did,
    transport: XrpcTransport,
    dpop_key: DpopKey,
    state: RwLock<DpopState>,
}

impl OAuthPdsClient {
    /// Construct a session from an already-issued access token and its
    /// bound DPoP key. Obtaining the token (the authorization-code and
    /// token-refresh flows) is outside this subsystem's scope.
    pub fn new(did: Did, pds: PdsUrl, access_token: String, dpop_key: DpopKey) -> Self {
        Self {
            did,
            transport: XrpcTransport::new(pds),
            dpop_key,
            state: RwLock::new(DpopState {
                access_token,
                nonce: None,
            }),
        }
    }

    /// Replace the access token after an out-of-band refresh.
    pub fn set_access_token(&self, access_token: String) {
        self.state
            .write()
            .expect("dpop state lock poisoned")
            .access_token = access_token;
    }

    fn snapshot(&self) -> (String, Option<String>) {
        let state = self.state.read().expect("dpop state lock poisoned");
        (state.access_token.clone(), state.nonce.clone())
    }

    fn remember_nonce(&self, response: &reqwest::Response) {
        if let Some(nonce) = response
            .headers()
            .get("DPoP-Nonce")
            .and_then(|v| v.to_str().ok())
        {
            self.state.write().expect("dpop state lock poisoned").nonce = Some(nonce.to_string());
        }
    }

    /// Run one DPoP-signed request, retrying exactly once if the PDS
    /// challenges with a fresh nonce (`use_dpop_nonce`).
    async fn dispatch<R: DeserializeOwned>(
        &self,
        htm: &'static str,
        nsid: &str,
        build: impl Fn(RequestBuilder) -> RequestBuilder,
    ) -> Result<R, PdsError> {
        let url = self.transport.pds().xrpc_url(nsid);
        let mut retried = false;

        loop {
            let (access_token, nonce) = self.snapshot();
            let proof = self
                .dpop_key
                .proof(htm, &url, nonce.as_deref(), Some(&access_token));

            let base = if htm == "GET" {
                self.transport.get(nsid)
            } else {
                self.transport.post(nsid)
            };
            let auth = HeaderValue::from_str(&format!("DPoP {access_token}"))
                .map_err(|_| PdsError::Other("invalid access token characters".into()))?;
            let request = build(base).header(AUTHORIZATION, auth).header("DPoP", proof);

            let response = transport::send(request).await?;
            self.remember_nonce(&response);

            if response.status().as_u16() == 400 && !retried {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| PdsError::Other(format!("reading response body: {e}")))?;
                if is_use_dpop_nonce(&bytes) {
                    debug!("retrying request with fresh DPoP nonce");
                    retried = true;
                    continue;
                }
                let message: crate::endpoints::XrpcErrorResponse =
                    serde_json::from_slice(&bytes).unwrap_or_default();
                return Err(PdsError::from_status(
                    400,
                    message.message.or(message.error).unwrap_or_default(),
                ));
            }

            let status = response.status();
            if status.is_success() {
                return response
                    .json::<R>()
                    .await
                    .map_err(|e| PdsError::Other(format!("decoding response body: {e}")));
            }
            return Err(self.transport.handle_response::<R>(response).await.unwrap_err());
        }
    }

    async fn dispatch_empty(
        &self,
        htm: &'static str,
        nsid: &str,
        build: impl Fn(RequestBuilder) -> RequestBuilder,
    ) -> Result<(), PdsError> {
        let url = self.transport.pds().xrpc_url(nsid);
        let mut retried = false;

        loop {
            let (access_token, nonce) = self.snapshot();
            let proof = self
                .dpop_key
                .proof(htm, &url, nonce.as_deref(), Some(&access_token));

            let base = self.transport.post(nsid);
            let auth = HeaderValue::from_str(&format!("DPoP {access_token}"))
                .map_err(|_| PdsError::Other("invalid access token characters".into()))?;
            let request = build(base).header(AUTHORIZATION, auth).header("DPoP", proof);

            let response = transport::send(request).await?;
            self.remember_nonce(&response);

            if response.status().as_u16() == 400 && !retried {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| PdsError::Other(format!("reading response body: {e}")))?;
                if is_use_dpop_nonce(&bytes) {
                    retried = true;
                    continue;
                }
                let message: crate::endpoints::XrpcErrorResponse =
                    serde_json::from_slice(&bytes).unwrap_or_default();
                return Err(PdsError::from_status(
                    400,
                    message.message.or(message.error).unwrap_or_default(),
                ));
            }

            return self.transport.handle_empty_response(response).await;
        }
    }
}

fn is_use_dpop_nonce(body: &[u8]) -> bool {
    serde_json::from_slice::<crate::endpoints::XrpcErrorResponse>(body)
        .ok()
        .and_then(|b| b.error)
        .map(|e| e == "use_dpop_nonce")
        .unwrap_or(false)
}

#[async_trait]
impl PdsClient for OAuthPdsClient {
    fn did(&self) -> &Did {
        &self.did
    }

    fn host_url(&self) -> &str {
        self.transport.pds().as_str()
    }

    #[instrument(skip(self, record))]
    async fn create_record(
        &self,
        collection: &Nsid,
        rkey: Option<&str>,
        record: &VoteRecordValue,
    ) -> Result<CreatedRecord, PdsError> {
        let value = record.to_json();
        let repo = self.did.as_str().to_string();
        let collection_str = collection.as_str().to_string();
        let response: CreateRecordResponse = self
            .dispatch("POST", CREATE_RECORD, move |b| {
                b.json(&CreateRecordRequest {
                    repo: &repo,
                    collection: &collection_str,
                    record: &value,
                    rkey,
                })
            })
            .await?;

        let uri = AtUri::new(&response.uri)
            .map_err(|e| PdsError::Other(format!("PDS returned invalid AT URI: {e}")))?;
        Ok(CreatedRecord {
            uri,
            cid: response.cid,
        })
    }

    #[instrument(skip(self))]
    async fn delete_record(&self, collection: &Nsid, rkey: &str) -> Result<(), PdsError> {
        let repo = self.did.as_str().to_string();
        let collection_str = collection.as_str().to_string();
        let rkey = rkey.to_string();
        self.dispatch_empty("POST", DELETE_RECORD, move |b| {
            b.json(&DeleteRecordRequest {
                repo: &repo,
                collection: &collection_str,
                rkey: &rkey,
            })
        })
        .await
    }

    #[instrument(skip(self))]
    async fn list_records(
        &self,
        collection: &Nsid,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<ListRecordsOutput, PdsError> {
        let repo = self.did.as_str().to_string();
        let collection_str = collection.as_str().to_string();
        let cursor_owned = cursor.map(|c| c.to_string());
        let response: ListRecordsResponse = self
            .dispatch("GET", LIST_RECORDS, move |b| {
                b.query(&ListRecordsQuery {
                    repo: &repo,
                    collection: &collection_str,
                    limit,
                    cursor: cursor_owned.as_deref(),
                    reverse: true,
                })
            })
            .await?;

        let records = response
            .records
            .into_iter()
            .filter_map(|entry| match AtUri::new(&entry.uri) {
                Ok(uri) => Some(Record {
                    uri,
                    cid: entry.cid,
                    value: entry.value,
                }),
                Err(e) => {
                    warn!(uri = %entry.uri, error = %e, "skipping record with invalid URI");
                    None
                }
            })
            .collect();

        Ok(ListRecordsOutput {
            records,
            cursor: response.cursor,
        })
    }
}
