//! The Viewer-State Joiner: the read-side batch lookup feed endpoints use
//! to annotate posts/comments with the requesting user's own vote.
//! Stateless beyond the shared cache it reads from; never fatal to the
//! caller; a populate failure degrades to an empty mapping rather than
//! propagating an error into a feed response.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use coves_core::traits::PdsClient;
use coves_core::types::{AtUri, Did};

use crate::cache::{CachedVote, VoteCache};

/// Batch viewer-state hydration over a [`VoteCache`].
pub struct ViewerStateJoiner<'a> {
    cache: &'a VoteCache,
}

impl<'a> ViewerStateJoiner<'a> {
    /// Build a joiner against the given cache.
    pub fn new(cache: &'a VoteCache) -> Self {
        Self { cache }
    }

    /// Idempotent warmup hook callable by feed handlers before rendering a
    /// page, so the first real lookup doesn't pay pagination latency.
    #[instrument(skip(self, client, cancel), fields(user = %client.did()))]
    pub async fn ensure_cache_populated(&self, client: &dyn PdsClient, cancel: &CancellationToken) {
        if self.cache.is_cached(client.did()) {
            return;
        }
        if let Err(err) = self.cache.fetch_and_cache_from_pds(client, cancel).await {
            warn!(error = %err, "viewer-state warmup failed; feed will render without vote state");
        }
    }

    /// `getViewerVotesForSubjects(userDID, [subjectURIs])`. Never fatal: a
    /// missing cache, a populate failure, or no matches all return an empty
    /// mapping.
    #[instrument(skip(self, client, subjects, cancel), fields(user = %client.did(), n = subjects.len()))]
    pub async fn get_viewer_votes_for_subjects(
        &self,
        client: &dyn PdsClient,
        subjects: &[AtUri],
        cancel: &CancellationToken,
    ) -> HashMap<AtUri, CachedVote> {
        if !self.cache.is_cached(client.did()) {
            if let Err(err) = self.cache.fetch_and_cache_from_pds(client, cancel).await {
                warn!(error = %err, "viewer-state populate-on-miss failed; returning empty mapping");
                return HashMap::new();
            }
        }

        subjects
            .iter()
            .filter_map(|uri| self.cache.get_vote(client.did(), uri).map(|v| (uri.clone(), v)))
            .collect()
    }

    /// Same lookup restricted to a cache that's already known to be warm for
    /// `user`, used by callers that have already called
    /// [`Self::ensure_cache_populated`] and want a pure, non-async lookup
    /// with no possibility of a populate call: O(batch size), no network
    /// I/O for cache hits.
    pub fn lookup_cached(&self, user: &Did, subjects: &[AtUri]) -> HashMap<AtUri, CachedVote> {
        subjects
            .iter()
            .filter_map(|uri| self.cache.get_vote(user, uri).map(|v| (uri.clone(), v)))
            .collect()
    }
}
