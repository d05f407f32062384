//! Low-level XRPC HTTP plumbing shared by the bearer and DPoP-OAuth
//! [`PdsClient`](coves_core::traits::PdsClient) implementations.
//!
//! Request building (headers, DPoP signing, nonce retry) is the caller's
//! job; this module only knows how to reach a method's URL and how to
//! turn a `reqwest::Response` into a [`PdsError`] or a decoded body.

use coves_core::error::PdsError;
use coves_core::types::PdsUrl;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::endpoints::XrpcErrorResponse;

/// HTTP transport for XRPC requests against a single PDS host.
#[derive(Debug, Clone)]
pub struct XrpcTransport {
    client: reqwest::Client,
    pds: PdsUrl,
}

impl XrpcTransport {
    /// Build a new transport for the given PDS.
    pub fn new(pds: PdsUrl) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("coves-votes/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build HTTP client");

        Self { client, pds }
    }

    /// The PDS this transport talks to.
    pub fn pds(&self) -> &PdsUrl {
        &self.pds
    }

    /// A GET request builder targeting `method`'s XRPC URL.
    pub fn get(&self, method: &str) -> RequestBuilder {
        self.client.get(self.pds.xrpc_url(method))
    }

    /// A POST request builder targeting `method`'s XRPC URL.
    pub fn post(&self, method: &str) -> RequestBuilder {
        self.client.post(self.pds.xrpc_url(method))
    }

    /// Send a request, classifying the failure branch into a [`PdsError`]
    /// and decoding the success branch as `R`.
    pub async fn handle_response<R: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<R, PdsError> {
        let status = response.status();
        trace!(status = %status, "XRPC response");

        if status.is_success() {
            response
                .json::<R>()
                .await
                .map_err(|e| PdsError::Other(format!("decoding response body: {e}")))
        } else {
            Err(self.classify_error(status.as_u16(), response).await)
        }
    }

    /// Like [`handle_response`](Self::handle_response) but for endpoints
    /// (like `deleteRecord`) that return no body on success.
    pub async fn handle_empty_response(&self, response: reqwest::Response) -> Result<(), PdsError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.classify_error(status.as_u16(), response).await)
        }
    }

    async fn classify_error(&self, status: u16, response: reqwest::Response) -> PdsError {
        let message = match response.json::<XrpcErrorResponse>().await {
            Ok(body) => body
                .message
                .or(body.error)
                .unwrap_or_else(|| format!("http {status}")),
            Err(_) => format!("http {status}"),
        };
        PdsError::from_status(status, message)
    }
}

/// Send a request and report a transport-level failure (connection refused,
/// timeout, DNS) as [`PdsError::Other`] rather than panicking or retrying
/// silently.
pub async fn send(builder: RequestBuilder) -> Result<reqwest::Response, PdsError> {
    builder
        .send()
        .await
        .map_err(|e| PdsError::Other(format!("request failed: {e}")))
}
