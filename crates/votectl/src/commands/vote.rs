//! `votectl vote` creates/deletes/lists against a real PDS over bearer auth.
//!
//! Always talks to a real `social.coves.feed.vote` collection through
//! [`coves_pds_xrpc::BearerPdsClient`]; there is no mock path here (that's
//! what `votectl demo` is for) since the point of this subcommand is manual
//! smoke-testing against a real or locally-run PDS.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tokio_util::sync::CancellationToken;

use coves_core::types::{AtUri, Did, PdsUrl};
use coves_pds_xrpc::BearerPdsClient;
use coves_votes::{SubjectInput, VoteCache, VoteService, ViewerStateJoiner};

use crate::output;

#[derive(Args, Debug)]
pub struct VoteCommand {
    #[command(subcommand)]
    pub action: VoteAction,
}

#[derive(Subcommand, Debug)]
pub enum VoteAction {
    /// Cast (or toggle) a vote.
    Create(CreateArgs),
    /// Remove a vote.
    Delete(DeleteArgs),
    /// Dump the voter's cached vote state, populating it from the PDS first.
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct PdsConnArgs {
    /// The authenticated voter's DID.
    #[arg(long)]
    pub did: String,

    /// The voter's PDS host URL.
    #[arg(long)]
    pub pds_url: String,

    /// Bearer access token for the voter's session.
    #[arg(long, env = "VOTECTL_TOKEN")]
    pub token: String,
}

impl PdsConnArgs {
    fn client(&self) -> Result<BearerPdsClient> {
        let did = Did::new(&self.did).context("invalid --did")?;
        let pds = PdsUrl::new(&self.pds_url).context("invalid --pds-url")?;
        Ok(BearerPdsClient::new(did, pds, self.token.clone()))
    }
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[command(flatten)]
    pub conn: PdsConnArgs,

    /// The subject's AT URI, e.g. at://did:plc:.../social.coves.feed.post/abc
    #[arg(long)]
    pub subject_uri: String,

    /// The subject's CID, as observed by the caller.
    #[arg(long)]
    pub subject_cid: String,

    /// "up" or "down".
    #[arg(long)]
    pub direction: String,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub conn: PdsConnArgs,

    /// The subject's AT URI.
    #[arg(long)]
    pub subject_uri: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub conn: PdsConnArgs,
}

pub async fn handle(cmd: VoteCommand) -> Result<()> {
    match cmd.action {
        VoteAction::Create(args) => create(args).await,
        VoteAction::Delete(args) => delete(args).await,
        VoteAction::List(args) => list(args).await,
    }
}

async fn create(args: CreateArgs) -> Result<()> {
    let client = args.conn.client()?;
    let cache = VoteCache::default();
    let service = VoteService::new(&cache);

    let subject = SubjectInput { uri: args.subject_uri, cid: Some(args.subject_cid) };
    let outcome = service
        .create_vote(&client, &subject, &args.direction, &CancellationToken::new())
        .await
        .context("CreateVote failed")?;

    match outcome {
        coves_votes::CreateVoteOutcome::Created { uri, cid } => {
            output::success("vote recorded");
            output::field("uri", &uri.to_string());
            output::field("cid", &cid);
        }
        coves_votes::CreateVoteOutcome::ToggledOff => {
            output::success("vote toggled off");
        }
    }
    Ok(())
}

async fn delete(args: DeleteArgs) -> Result<()> {
    let client = args.conn.client()?;
    let cache = VoteCache::default();
    let service = VoteService::new(&cache);

    let subject = SubjectInput { uri: args.subject_uri, cid: None };
    service
        .delete_vote(&client, &subject, &CancellationToken::new())
        .await
        .context("DeleteVote failed")?;

    output::success("vote deleted");
    Ok(())
}

async fn list(args: ListArgs) -> Result<()> {
    let client = args.conn.client()?;
    let cache = VoteCache::default();
    let joiner = ViewerStateJoiner::new(&cache);
    let cancel = CancellationToken::new();

    joiner.ensure_cache_populated(&client, &cancel).await;
    let votes = cache
        .get_votes_for_user(client.did())
        .context("cache population yielded no entry (check auth)")?;

    let dump: Vec<_> = votes
        .into_iter()
        .map(|(subject, vote): (AtUri, _)| {
            serde_json::json!({
                "subject": subject.to_string(),
                "direction": vote.direction.as_str(),
                "uri": vote.uri.to_string(),
            })
        })
        .collect();

    output::json_pretty(&dump)
}
