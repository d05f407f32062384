//! `votectl demo` runs fresh-vote/toggle-off/flip scenarios against an
//! in-memory mock PDS, so the toggle state machine can be smoke-tested with
//! no network access at all.

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use coves_core::types::{Did, PdsUrl};
use coves_pds_mock::MockPdsClient;
use coves_votes::{CreateVoteOutcome, SubjectInput, VoteCache, VoteService};

use crate::output;

pub async fn run() -> Result<()> {
    let did = Did::new("did:plc:votectldemo00000000000")?;
    let client = MockPdsClient::new(did, PdsUrl::new("http://localhost:2583")?);
    let cache = VoteCache::default();
    let service = VoteService::new(&cache);
    let cancel = CancellationToken::new();

    let subject = SubjectInput {
        uri: "at://did:plc:author/social.coves.feed.post/r1".to_string(),
        cid: Some("bafyreidemopost1".to_string()),
    };

    output::field("scenario", "S1: fresh upvote");
    let outcome = service.create_vote(&client, &subject, "up", &cancel).await?;
    describe(&outcome);

    output::field("scenario", "S2: toggle-off (same direction again)");
    let outcome = service.create_vote(&client, &subject, "up", &cancel).await?;
    describe(&outcome);

    output::field("scenario", "S1 again: fresh upvote");
    service.create_vote(&client, &subject, "up", &cancel).await?;

    output::field("scenario", "S3: flip up -> down");
    let outcome = service.create_vote(&client, &subject, "down", &cancel).await?;
    describe(&outcome);

    output::success("demo scenarios completed with no PDS network access");
    Ok(())
}

fn describe(outcome: &CreateVoteOutcome) {
    match outcome {
        CreateVoteOutcome::Created { uri, cid } => {
            output::field("uri", &uri.to_string());
            output::field("cid", cid);
        }
        CreateVoteOutcome::ToggledOff => output::field("result", "toggled off"),
    }
}
