//! Cache and locator configuration: TTL policy and locator safety limits.

use std::time::Duration;

/// Tunables for [`crate::VoteCache`] and [`crate::VoteLocator`].
///
/// No environment or file parsing happens here; a host application's own
/// config layer is expected to construct this from whatever source it
/// already uses (env, file, flags) and pass it in explicitly, the same way
/// a `PdsUrl` or a set of credentials is built by the caller before being
/// handed to a session constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteCacheConfig {
    /// How long a populated cache entry stays valid before it must be
    /// repopulated. Extended on every successful mutation by that user.
    pub ttl: Duration,

    /// Page size used when paginating `listRecords` to populate a user's
    /// cache entry or to walk the locator's slow path.
    pub page_size: u32,

    /// Safety limit on pages walked by the locator's slow path before
    /// giving up and reporting "no prior vote".
    pub safety_page_limit: u32,
}

impl VoteCacheConfig {
    /// A TTL long enough to absorb repeated toggles in a session without
    /// going stale for long stretches of idle time.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

    /// `listRecords`'s page size.
    pub const DEFAULT_PAGE_SIZE: u32 = 100;

    /// 50 pages at 100 records/page = 5,000 records.
    pub const DEFAULT_SAFETY_PAGE_LIMIT: u32 = 50;
}

impl Default for VoteCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Self::DEFAULT_TTL,
            page_size: Self::DEFAULT_PAGE_SIZE,
            safety_page_limit: Self::DEFAULT_SAFETY_PAGE_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_recommended_values() {
        let config = VoteCacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(600));
        assert_eq!(config.page_size, 100);
        assert_eq!(config.safety_page_limit, 50);
    }
}
