//! Mock-PDS integration tests for both `PdsClient` implementations.
//!
//! These exercise the wire format directly against a `wiremock` server
//! rather than a real PDS, the same way the crate this workspace grew out
//! of tests its own XRPC client.

use coves_core::repo::{Direction, StrongRef, VoteRecordValue};
use coves_core::traits::PdsClient;
use coves_core::types::{AtUri, Did, Nsid, PdsUrl};
use coves_pds_xrpc::dpop::DpopKey;
use coves_pds_xrpc::{BearerPdsClient, OAuthPdsClient};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_pds_url(server: &MockServer) -> PdsUrl {
    PdsUrl::new(&format!("http://127.0.0.1:{}", server.address().port())).unwrap()
}

fn test_did() -> Did {
    Did::new("did:plc:alice1234567890abcdef").unwrap()
}

fn test_vote() -> VoteRecordValue {
    VoteRecordValue::new(
        StrongRef {
            uri: AtUri::new("at://did:plc:author/app.bsky.feed.post/r1").unwrap(),
            cid: "bafyreipost1".to_string(),
        },
        Direction::Up,
    )
}

#[tokio::test]
async fn bearer_create_record_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.repo.createRecord"))
        .and(header("authorization", "Bearer static-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uri": "at://did:plc:alice1234567890abcdef/social.coves.feed.vote/3k2x",
            "cid": "bafyreivote1"
        })))
        .mount(&server)
        .await;

    let client = BearerPdsClient::new(test_did(), mock_pds_url(&server), "static-token".into());
    let collection = Nsid::new("social.coves.feed.vote").unwrap();
    let created = client
        .create_record(&collection, Some("3k2x"), &test_vote())
        .await
        .unwrap();

    assert_eq!(created.cid, "bafyreivote1");
    assert_eq!(created.uri.rkey().as_str(), "3k2x");
}

#[tokio::test]
async fn bearer_delete_record_not_found_maps_to_pds_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.repo.deleteRecord"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "RecordNotFound",
            "message": "could not locate record"
        })))
        .mount(&server)
        .await;

    let client = BearerPdsClient::new(test_did(), mock_pds_url(&server), "static-token".into());
    let collection = Nsid::new("social.coves.feed.vote").unwrap();
    let err = client.delete_record(&collection, "3k2x").await.unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn bearer_list_records_paginates_via_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrpc/com.atproto.repo.listRecords"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{
                "uri": "at://did:plc:alice1234567890abcdef/social.coves.feed.vote/3k2x",
                "cid": "bafyreivote1",
                "value": {
                    "$type": "social.coves.feed.vote",
                    "subject": {"uri": "at://did:plc:author/app.bsky.feed.post/r1", "cid": "bafyreipost1"},
                    "direction": "up",
                    "createdAt": "2024-01-01T00:00:00Z"
                }
            }],
            "cursor": "next-page-token"
        })))
        .mount(&server)
        .await;

    let client = BearerPdsClient::new(test_did(), mock_pds_url(&server), "static-token".into());
    let collection = Nsid::new("social.coves.feed.vote").unwrap();
    let output = client.list_records(&collection, 100, None).await.unwrap();

    assert_eq!(output.records.len(), 1);
    assert_eq!(output.cursor.as_deref(), Some("next-page-token"));
}

#[tokio::test]
async fn oauth_create_record_retries_once_on_dpop_nonce_challenge() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.repo.createRecord"))
        .respond_with(
            ResponseTemplate::new(400)
                .insert_header("DPoP-Nonce", "fresh-nonce")
                .set_body_json(json!({"error": "use_dpop_nonce", "message": "retry with nonce"})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.repo.createRecord"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uri": "at://did:plc:alice1234567890abcdef/social.coves.feed.vote/3k2x",
            "cid": "bafyreivote1"
        })))
        .mount(&server)
        .await;

    let key = DpopKey::generate();
    let client = OAuthPdsClient::new(
        test_did(),
        mock_pds_url(&server),
        "access-token".into(),
        key,
    );
    let collection = Nsid::new("social.coves.feed.vote").unwrap();
    let created = client
        .create_record(&collection, Some("3k2x"), &test_vote())
        .await
        .unwrap();

    assert_eq!(created.cid, "bafyreivote1");
}
