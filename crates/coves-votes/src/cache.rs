//! The per-user vote cache.
//!
//! Modeled as an owned value with explicit construction, not an ambient
//! singleton; a host application builds one `VoteCache`, wraps it in an
//! `Arc`, and hands it to every [`VoteService`](crate::VoteService),
//! [`VoteLocator`](crate::VoteLocator), and
//! [`ViewerStateJoiner`](crate::ViewerStateJoiner) that needs it.
//!
//! Concurrency primitive: a single `std::sync::RwLock`. No cache operation
//! ever awaits while holding the lock. `fetch_and_cache_from_pds` paginates
//! into a local `HashMap` first and only takes the exclusive lock to swap
//! it in, which is also what makes cancellation-safety free: a cancelled
//! populate simply never reaches the swap.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use coves_core::repo::{VoteRecordValue, VOTE_COLLECTION};
use coves_core::traits::PdsClient;
use coves_core::types::{AtUri, Did, Nsid, Rkey};

use crate::config::VoteCacheConfig;
use crate::error::VoteError;

/// A triple `{direction, recordURI, rkey}`.
///
/// `rkey` is derivable from `uri` (its last path segment) but is cached
/// alongside it to avoid re-parsing on every delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedVote {
    pub direction: coves_core::repo::Direction,
    pub uri: AtUri,
    pub rkey: Rkey,
}

impl CachedVote {
    /// Construct a cached vote from a freshly created/observed record URI,
    /// deriving `rkey` from it.
    pub fn new(direction: coves_core::repo::Direction, uri: AtUri) -> Self {
        let rkey = uri.rkey().clone();
        Self { direction, uri, rkey }
    }
}

struct CacheEntry {
    votes: HashMap<AtUri, CachedVote>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Process-local, TTL-bounded, concurrency-safe map of every authenticated
/// user's vote records.
pub struct VoteCache {
    config: VoteCacheConfig,
    entries: RwLock<HashMap<Did, CacheEntry>>,
}

impl VoteCache {
    /// Construct an empty cache with the given configuration.
    pub fn new(config: VoteCacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// This cache's configuration (TTL, page size, safety limit).
    pub fn config(&self) -> &VoteCacheConfig {
        &self.config
    }

    fn extend(&self) -> Instant {
        Instant::now() + self.config.ttl
    }

    /// `true` iff an entry exists for `user` and hasn't expired.
    pub fn is_cached(&self, user: &Did) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(user).is_some_and(CacheEntry::is_live)
    }

    /// A snapshot copy of `user`'s full vote map, or `None` if expired/missing.
    ///
    /// The internal map never escapes unlocked; this always returns an
    /// owned clone.
    pub fn get_votes_for_user(&self, user: &Did) -> Option<HashMap<AtUri, CachedVote>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(user)?;
        entry.is_live().then(|| entry.votes.clone())
    }

    /// `user`'s cached vote on `subject`, or `None` if absent/expired.
    pub fn get_vote(&self, user: &Did, subject: &AtUri) -> Option<CachedVote> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(user)?;
        if !entry.is_live() {
            return None;
        }
        entry.votes.get(subject).cloned()
    }

    /// Replace `user`'s entire entry, resetting the TTL.
    pub fn set_votes_for_user(&self, user: &Did, votes: HashMap<AtUri, CachedVote>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            user.clone(),
            CacheEntry {
                votes,
                expires_at: self.extend(),
            },
        );
    }

    /// Upsert a single vote for `user`, extending the TTL.
    pub fn set_vote(&self, user: &Did, subject: AtUri, vote: CachedVote) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let expires_at = self.extend();
        let entry = entries.entry(user.clone()).or_insert_with(|| CacheEntry {
            votes: HashMap::new(),
            expires_at,
        });
        entry.votes.insert(subject, vote);
        entry.expires_at = expires_at;
    }

    /// Remove `user`'s vote on `subject` if present, extending the TTL.
    pub fn remove_vote(&self, user: &Did, subject: &AtUri) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = entries.get_mut(user) {
            entry.votes.remove(subject);
            entry.expires_at = self.extend();
        }
    }

    /// Drop `user`'s entry entirely; the next access forces a repopulate.
    pub fn invalidate(&self, user: &Did) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(user);
    }

    /// Populate (or replace) the entry for `client.did()` by fully
    /// enumerating its `social.coves.feed.vote` collection.
    ///
    /// Records missing required fields are skipped silently. Auth failures
    /// surface as [`VoteError::NotAuthorized`] without being rewritten.
    /// Cancellation mid-walk discards the partial map; nothing is
    /// committed to the cache.
    #[instrument(skip(self, client, cancel), fields(user = %client.did()))]
    pub async fn fetch_and_cache_from_pds(
        &self,
        client: &dyn PdsClient,
        cancel: &CancellationToken,
    ) -> Result<(), VoteError> {
        let collection = Nsid::new(VOTE_COLLECTION).expect("constant NSID is always valid");
        let mut votes = HashMap::new();
        let mut cursor: Option<String> = None;

        loop {
            if cancel.is_cancelled() {
                return Err(VoteError::Cancelled);
            }

            let page = tokio::select! {
                res = client.list_records(&collection, self.config.page_size, cursor.as_deref()) => {
                    res.map_err(VoteError::from_pds)?
                }
                _ = cancel.cancelled() => return Err(VoteError::Cancelled),
            };

            for record in &page.records {
                let Ok(value) = VoteRecordValue::from_json(&record.value) else {
                    continue;
                };
                votes.insert(
                    value.subject.uri.clone(),
                    CachedVote::new(value.direction, record.uri.clone()),
                );
            }

            match page.cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        if cancel.is_cancelled() {
            return Err(VoteError::Cancelled);
        }

        self.set_votes_for_user(client.did(), votes);
        Ok(())
    }
}

impl Default for VoteCache {
    fn default() -> Self {
        Self::new(VoteCacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coves_core::repo::Direction;
    use coves_core::types::{Did, PdsUrl};
    use coves_pds_mock::MockPdsClient;

    fn user() -> Did {
        Did::new("did:plc:alice1234567890abcdef").unwrap()
    }

    fn subject(n: u8) -> AtUri {
        AtUri::new(format!("at://did:plc:author/app.bsky.feed.post/r{n}")).unwrap()
    }

    fn vote_uri(rkey: &str) -> AtUri {
        AtUri::new(format!("at://did:plc:alice1234567890abcdef/social.coves.feed.vote/{rkey}"))
            .unwrap()
    }

    #[test]
    fn missing_entry_is_not_cached() {
        let cache = VoteCache::default();
        assert!(!cache.is_cached(&user()));
        assert!(cache.get_vote(&user(), &subject(1)).is_none());
    }

    #[test]
    fn set_and_get_vote_round_trips() {
        let cache = VoteCache::default();
        let vote = CachedVote::new(Direction::Up, vote_uri("3k2x"));
        cache.set_vote(&user(), subject(1), vote.clone());

        assert!(cache.is_cached(&user()));
        assert_eq!(cache.get_vote(&user(), &subject(1)), Some(vote));
    }

    #[test]
    fn remove_vote_drops_single_entry_but_keeps_user_cached() {
        let cache = VoteCache::default();
        cache.set_vote(&user(), subject(1), CachedVote::new(Direction::Up, vote_uri("3k2x")));
        cache.remove_vote(&user(), &subject(1));

        assert!(cache.is_cached(&user()));
        assert!(cache.get_vote(&user(), &subject(1)).is_none());
    }

    #[test]
    fn invalidate_drops_whole_entry() {
        let cache = VoteCache::default();
        cache.set_vote(&user(), subject(1), CachedVote::new(Direction::Up, vote_uri("3k2x")));
        cache.invalidate(&user());

        assert!(!cache.is_cached(&user()));
    }

    #[test]
    fn expired_entry_reads_as_absent() {
        let config = VoteCacheConfig {
            ttl: Duration::from_millis(1),
            ..VoteCacheConfig::default()
        };
        let cache = VoteCache::new(config);
        cache.set_vote(&user(), subject(1), CachedVote::new(Direction::Up, vote_uri("3k2x")));
        std::thread::sleep(Duration::from_millis(20));

        assert!(!cache.is_cached(&user()));
        assert!(cache.get_vote(&user(), &subject(1)).is_none());
    }

    #[tokio::test]
    async fn fetch_and_cache_populates_from_pds() {
        let did = user();
        let client = MockPdsClient::new(did.clone(), PdsUrl::new("http://localhost:2583").unwrap());
        let collection = Nsid::new(VOTE_COLLECTION).unwrap();
        client.seed(
            &collection,
            "3k2x",
            &VoteRecordValue::new(
                coves_core::repo::StrongRef { uri: subject(1), cid: "bafy1".into() },
                Direction::Up,
            ),
        );

        let cache = VoteCache::default();
        cache
            .fetch_and_cache_from_pds(&client, &CancellationToken::new())
            .await
            .unwrap();

        assert!(cache.is_cached(&did));
        let votes = cache.get_votes_for_user(&did).unwrap();
        assert_eq!(votes.len(), 1);
    }

    #[tokio::test]
    async fn fetch_and_cache_handles_multiple_pages() {
        let did = user();
        let client = MockPdsClient::new(did.clone(), PdsUrl::new("http://localhost:2583").unwrap());
        let collection = Nsid::new(VOTE_COLLECTION).unwrap();
        for i in 0..250u16 {
            client.seed(
                &collection,
                &format!("rk{i:05}"),
                &VoteRecordValue::new(
                    coves_core::repo::StrongRef {
                        uri: AtUri::new(format!("at://did:plc:author/app.bsky.feed.post/r{i}")).unwrap(),
                        cid: "bafy1".into(),
                    },
                    Direction::Up,
                ),
            );
        }

        let cache = VoteCache::new(VoteCacheConfig {
            page_size: 100,
            ..VoteCacheConfig::default()
        });
        cache
            .fetch_and_cache_from_pds(&client, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(cache.get_votes_for_user(&did).unwrap().len(), 250);
    }

    #[tokio::test]
    async fn cancelled_populate_discards_partial_map() {
        let did = user();
        let client = MockPdsClient::new(did.clone(), PdsUrl::new("http://localhost:2583").unwrap());
        let collection = Nsid::new(VOTE_COLLECTION).unwrap();
        for i in 0..5u8 {
            client.seed(
                &collection,
                &format!("rk{i}"),
                &VoteRecordValue::new(
                    coves_core::repo::StrongRef { uri: subject(i), cid: "bafy1".into() },
                    Direction::Up,
                ),
            );
        }

        let cache = VoteCache::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = cache.fetch_and_cache_from_pds(&client, &cancel).await.unwrap_err();
        assert!(matches!(err, VoteError::Cancelled));
        assert!(!cache.is_cached(&did));
    }
}
