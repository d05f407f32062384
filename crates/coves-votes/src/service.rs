//! The Vote Service: the only write path for vote records. Exposes
//! `CreateVote`/`DeleteVote` with the toggle state machine over the
//! locator and the PDS client contract, and keeps the cache in sync before
//! returning to the caller.

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use coves_core::repo::{Direction, StrongRef, VoteRecordValue, VOTE_COLLECTION};
use coves_core::traits::PdsClient;
use coves_core::types::{AtUri, Nsid, TidGenerator};

use crate::cache::{CachedVote, VoteCache};
use crate::error::VoteError;
use crate::locator::VoteLocator;

/// The subject a vote targets, as supplied by the caller.
#[derive(Debug, Clone)]
pub struct SubjectInput {
    pub uri: String,
    pub cid: Option<String>,
}

/// What `CreateVote` returns: either the new vote's identity, or the empty
/// pair that signals a toggle-off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateVoteOutcome {
    /// A vote record now exists at `uri`/`cid`, either freshly created or
    /// the second leg of a flip.
    Created { uri: AtUri, cid: String },
    /// The prior vote was deleted and nothing replaced it (toggle-off).
    ToggledOff,
}

/// Orchestrates `CreateVote`/`DeleteVote` over a [`VoteLocator`] and a
/// [`PdsClient`], updating a [`VoteCache`] after every successful write.
/// Holds no PDS client of its own; one is supplied per call,
/// matching the session-scoped lifetime of an authenticated request.
pub struct VoteService<'a> {
    cache: &'a VoteCache,
    tids: &'static TidGenerator,
}

impl<'a> VoteService<'a> {
    /// Build a service against the given cache, using the process-wide rkey
    /// generator ([`TidGenerator::global`]); a `VoteService` is typically
    /// constructed fresh per request, so a per-instance generator would lose
    /// the cross-request monotonicity guarantee the toggle flow relies on.
    pub fn new(cache: &'a VoteCache) -> Self {
        Self { cache, tids: TidGenerator::global() }
    }

    fn collection() -> Nsid {
        Nsid::new(VOTE_COLLECTION).expect("constant NSID is always valid")
    }

    fn validate_direction(direction: &str) -> Result<Direction, VoteError> {
        Direction::parse(direction).ok_or(VoteError::InvalidDirection)
    }

    fn validate_subject(subject: &SubjectInput, require_cid: bool) -> Result<(AtUri, Option<String>), VoteError> {
        if !subject.uri.starts_with("at://") {
            return Err(VoteError::InvalidSubject(format!(
                "subject.uri must start with 'at://', got {:?}",
                subject.uri
            )));
        }
        let uri = AtUri::new(&subject.uri)
            .map_err(|e| VoteError::InvalidSubject(format!("malformed subject.uri: {e}")))?;

        if require_cid && subject.cid.as_deref().map(str::is_empty).unwrap_or(true) {
            return Err(VoteError::InvalidSubject("subject.cid is required to create a vote".into()));
        }

        Ok((uri, subject.cid.clone()))
    }

    /// `CreateVote(session, {subject, direction})`. Applies the toggle
    /// state machine: absent→create, same-direction→delete (toggle off),
    /// opposite-direction→delete then create (flip).
    #[instrument(skip(self, client, cancel), fields(user = %client.did()))]
    pub async fn create_vote(
        &self,
        client: &dyn PdsClient,
        subject: &SubjectInput,
        direction: &str,
        cancel: &CancellationToken,
    ) -> Result<CreateVoteOutcome, VoteError> {
        let direction = Self::validate_direction(direction)?;
        let (subject_uri, cid) = Self::validate_subject(subject, true)?;
        let cid = cid.expect("require_cid=true guarantees Some");

        let locator = VoteLocator::new(self.cache);
        let prior = locator.find_prior_vote(client, &subject_uri, cancel).await?;

        match prior {
            None => {
                let created = self.create_record(client, &subject_uri, &cid, direction).await?;
                self.cache.set_vote(client.did(), subject_uri, CachedVote::new(direction, created.uri.clone()));
                Ok(CreateVoteOutcome::Created { uri: created.uri, cid: created.cid })
            }
            Some(existing) if existing.direction == direction => {
                self.delete_record(client, existing.rkey.as_str()).await?;
                self.cache.remove_vote(client.did(), &subject_uri);
                Ok(CreateVoteOutcome::ToggledOff)
            }
            Some(existing) => {
                // Flip: delete the old leg first. A `NotFound` here means
                // someone else already deleted it; treat as success and
                // continue to the create leg.
                match self.delete_record(client, existing.rkey.as_str()).await {
                    Ok(()) | Err(VoteError::VoteNotFound) => {}
                    Err(err) => return Err(err),
                }
                self.cache.remove_vote(client.did(), &subject_uri);

                match self.create_record(client, &subject_uri, &cid, direction).await {
                    Ok(created) => {
                        self.cache.set_vote(
                            client.did(),
                            subject_uri,
                            CachedVote::new(direction, created.uri.clone()),
                        );
                        Ok(CreateVoteOutcome::Created { uri: created.uri, cid: created.cid })
                    }
                    Err(err) => {
                        // PartialFlip: the cache already reflects the
                        // delete, so a retry takes the "absent" branch.
                        Err(VoteError::PartialFlip { deleted: existing.uri, source: pds_source(err) })
                    }
                }
            }
        }
    }

    /// `DeleteVote(session, {subject})`. Fails `VoteNotFound` if the user
    /// has no live vote on the subject.
    #[instrument(skip(self, client, cancel), fields(user = %client.did()))]
    pub async fn delete_vote(
        &self,
        client: &dyn PdsClient,
        subject: &SubjectInput,
        cancel: &CancellationToken,
    ) -> Result<(), VoteError> {
        let (subject_uri, _) = Self::validate_subject(subject, false)?;

        let locator = VoteLocator::new(self.cache);
        let prior = locator.find_prior_vote(client, &subject_uri, cancel).await?;

        let Some(existing) = prior else {
            return Err(VoteError::VoteNotFound);
        };

        // A PDS delete returning NotFound here means authoritative state
        // disagrees with the cache; map to VoteNotFound and invalidate the
        // user's cache entry rather than trust the stale cached vote.
        match self.delete_record(client, existing.rkey.as_str()).await {
            Ok(()) => {
                self.cache.remove_vote(client.did(), &subject_uri);
                Ok(())
            }
            Err(VoteError::VoteNotFound) => {
                self.cache.invalidate(client.did());
                Err(VoteError::VoteNotFound)
            }
            Err(err) => Err(err),
        }
    }

    async fn create_record(
        &self,
        client: &dyn PdsClient,
        subject_uri: &AtUri,
        cid: &str,
        direction: Direction,
    ) -> Result<coves_core::traits::CreatedRecord, VoteError> {
        let rkey = self.tids.next();
        let record = VoteRecordValue::new(
            StrongRef { uri: subject_uri.clone(), cid: cid.to_string() },
            direction,
        );
        client
            .create_record(&Self::collection(), Some(rkey.as_str()), &record)
            .await
            .map_err(VoteError::from_pds)
    }

    async fn delete_record(&self, client: &dyn PdsClient, rkey: &str) -> Result<(), VoteError> {
        match client.delete_record(&Self::collection(), rkey).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Err(VoteError::VoteNotFound),
            Err(e) => Err(VoteError::from_pds(e)),
        }
    }
}

/// Unwraps the underlying [`coves_core::error::PdsError`] out of the
/// [`VoteError`] a failed `create_record` call produces (always
/// `NotAuthorized` or `PdsUnavailable`, since `Self::create_record` only
/// ever builds those two via `VoteError::from_pds`), for attaching to
/// [`VoteError::PartialFlip`].
fn pds_source(err: VoteError) -> coves_core::error::PdsError {
    match err {
        VoteError::PdsUnavailable(source) => source,
        VoteError::NotAuthorized => coves_core::error::PdsError::Unauthorized,
        other => unreachable!("create_record never produces {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coves_core::types::{Did, PdsUrl};
    use coves_pds_mock::MockPdsClient;

    fn user() -> Did {
        Did::new("did:plc:alice1234567890abcdef").unwrap()
    }

    fn client() -> MockPdsClient {
        MockPdsClient::new(user(), PdsUrl::new("http://localhost:2583").unwrap())
    }

    fn subject() -> SubjectInput {
        SubjectInput {
            uri: "at://did:plc:author/app.bsky.feed.post/r1".to_string(),
            cid: Some("bafyreipost1".to_string()),
        }
    }

    #[tokio::test]
    async fn fresh_upvote_creates_record() {
        let cache = VoteCache::default();
        let service = VoteService::new(&cache);
        let client = client();

        let outcome = service
            .create_vote(&client, &subject(), "up", &CancellationToken::new())
            .await
            .unwrap();

        let CreateVoteOutcome::Created { uri, .. } = outcome else {
            panic!("expected a created vote");
        };
        assert_eq!(uri.repo(), client.did());
        assert!(cache.get_vote(client.did(), &AtUri::new(&subject().uri).unwrap()).is_some());
    }

    #[tokio::test]
    async fn same_direction_toggles_off() {
        let cache = VoteCache::default();
        let service = VoteService::new(&cache);
        let client = client();
        let cancel = CancellationToken::new();

        service.create_vote(&client, &subject(), "up", &cancel).await.unwrap();
        let outcome = service.create_vote(&client, &subject(), "up", &cancel).await.unwrap();

        assert_eq!(outcome, CreateVoteOutcome::ToggledOff);
        assert!(cache
            .get_vote(client.did(), &AtUri::new(&subject().uri).unwrap())
            .is_none());
        let collection = Nsid::new(VOTE_COLLECTION).unwrap();
        assert_eq!(client.count(&collection), 0);
    }

    #[tokio::test]
    async fn opposite_direction_flips() {
        let cache = VoteCache::default();
        let service = VoteService::new(&cache);
        let client = client();
        let cancel = CancellationToken::new();

        let first = service.create_vote(&client, &subject(), "up", &cancel).await.unwrap();
        let second = service.create_vote(&client, &subject(), "down", &cancel).await.unwrap();

        let (CreateVoteOutcome::Created { uri: first_uri, .. }, CreateVoteOutcome::Created { uri: second_uri, .. }) =
            (first, second)
        else {
            panic!("expected both legs to produce a record");
        };
        assert_ne!(first_uri, second_uri);

        let collection = Nsid::new(VOTE_COLLECTION).unwrap();
        assert_eq!(client.count(&collection), 1);
        let cached = cache.get_vote(client.did(), &AtUri::new(&subject().uri).unwrap()).unwrap();
        assert_eq!(cached.direction, Direction::Down);
        assert_eq!(cached.uri, second_uri);
    }

    #[tokio::test]
    async fn delete_without_prior_vote_fails() {
        let cache = VoteCache::default();
        let service = VoteService::new(&cache);
        let client = client();

        let err = service
            .delete_vote(&client, &subject(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, VoteError::VoteNotFound));
    }

    #[tokio::test]
    async fn delete_after_vote_succeeds_and_clears_cache() {
        let cache = VoteCache::default();
        let service = VoteService::new(&cache);
        let client = client();
        let cancel = CancellationToken::new();

        service.create_vote(&client, &subject(), "up", &cancel).await.unwrap();
        service.delete_vote(&client, &subject(), &cancel).await.unwrap();

        assert!(cache
            .get_vote(client.did(), &AtUri::new(&subject().uri).unwrap())
            .is_none());
        let collection = Nsid::new(VOTE_COLLECTION).unwrap();
        assert_eq!(client.count(&collection), 0);
    }

    #[tokio::test]
    async fn invalid_direction_is_rejected_before_any_pds_call() {
        let cache = VoteCache::default();
        let service = VoteService::new(&cache);
        let client = client();

        let err = service
            .create_vote(&client, &subject(), "sideways", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, VoteError::InvalidDirection));
    }

    #[tokio::test]
    async fn invalid_subject_uri_is_rejected() {
        let cache = VoteCache::default();
        let service = VoteService::new(&cache);
        let client = client();
        let bad = SubjectInput { uri: "not-a-uri".to_string(), cid: Some("bafy1".to_string()) };

        let err = service
            .create_vote(&client, &bad, "up", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, VoteError::InvalidSubject(_)));
    }

    #[tokio::test]
    async fn missing_cid_is_rejected_on_create() {
        let cache = VoteCache::default();
        let service = VoteService::new(&cache);
        let client = client();
        let bad = SubjectInput { uri: subject().uri, cid: None };

        let err = service
            .create_vote(&client, &bad, "up", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, VoteError::InvalidSubject(_)));
    }

    #[tokio::test]
    async fn cache_miss_fallback_still_toggles_correctly() {
        // A pre-existing PDS record with an empty/forced cache still
        // produces correct toggle semantics via the locator's slow path.
        let client = client();
        let collection = Nsid::new(VOTE_COLLECTION).unwrap();
        client.seed(
            &collection,
            "3k2xabcdefghi",
            &VoteRecordValue::new(
                StrongRef { uri: AtUri::new(&subject().uri).unwrap(), cid: "bafyreipost1".into() },
                Direction::Up,
            ),
        );

        let cache = VoteCache::default();
        let service = VoteService::new(&cache);
        let outcome = service
            .create_vote(&client, &subject(), "up", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, CreateVoteOutcome::ToggledOff);
        assert_eq!(client.count(&collection), 0);
    }
}
