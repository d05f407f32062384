//! The static bearer-token [`PdsClient`](coves_core::traits::PdsClient)
//! implementation, the simpler of the two auth variants, used for service
//! accounts and tests against PDS deployments that issue plain session
//! JWTs.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use tracing::{instrument, warn};

use coves_core::error::PdsError;
use coves_core::repo::{ListRecordsOutput, Record, VoteRecordValue};
use coves_core::traits::{CreatedRecord, PdsClient};
use coves_core::types::{AtUri, Did, Nsid, PdsUrl};

use crate::endpoints::*;
use crate::transport::{self, XrpcTransport};

/// A PDS client authenticated with a static bearer token.
pub struct BearerPdsClient {
    did: Did,
    transport: XrpcTransport,
    token: String,
}

impl BearerPdsClient {
    /// Construct a client for `did`'s repo, authenticated with `token`.
    pub fn new(did: Did, pds: PdsUrl, token: String) -> Self {
        Self {
            did,
            transport: XrpcTransport::new(pds),
            token,
        }
    }

    fn auth_header(&self) -> Result<HeaderValue, PdsError> {
        HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| PdsError::Other("invalid access token characters".into()))
    }
}

#[async_trait]
impl PdsClient for BearerPdsClient {
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
        let request = CreateRecordRequest {
            repo: self.did.as_str(),
            collection: collection.as_str(),
            record: &value,
            rkey,
        };
        let builder = self
            .transport
            .post(CREATE_RECORD)
            .header(AUTHORIZATION, self.auth_header()?)
            .json(&request);
        let response: CreateRecordResponse =
            self.transport.handle_response(transport::send(builder).await?).await?;

        let uri = AtUri::new(&response.uri)
            .map_err(|e| PdsError::Other(format!("PDS returned invalid AT URI: {e}")))?;
        Ok(CreatedRecord {
            uri,
            cid: response.cid,
        })
    }

    #[instrument(skip(self))]
    async fn delete_record(&self, collection: &Nsid, rkey: &str) -> Result<(), PdsError> {
        let request = DeleteRecordRequest {
            repo: self.did.as_str(),
            collection: collection.as_str(),
            rkey,
        };
        let builder = self
            .transport
            .post(DELETE_RECORD)
            .header(AUTHORIZATION, self.auth_header()?)
            .json(&request);
        self.transport
            .handle_empty_response(transport::send(builder).await?)
            .await
    }

    #[instrument(skip(self))]
    async fn list_records(
        &self,
        collection: &Nsid,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<ListRecordsOutput, PdsError> {
        let query = ListRecordsQuery {
            repo: self.did.as_str(),
            collection: collection.as_str(),
            limit,
            cursor,
            reverse: true,
        };
        let builder = self
            .transport
            .get(LIST_RECORDS)
            .header(AUTHORIZATION, self.auth_header()?)
            .query(&query);
        let response: ListRecordsResponse =
            self.transport.handle_response(transport::send(builder).await?).await?;

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructs_with_given_identity() {
        let did = Did::new("did:plc:abc123xyz456").unwrap();
        let pds = PdsUrl::new("https://pds.example.com").unwrap();
        let client = BearerPdsClient::new(did.clone(), pds, "tok".to_string());
        assert_eq!(client.did(), &did);
    }
}
