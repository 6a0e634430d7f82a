//! In-memory caches
//!
//! These caches are volatile and cleared on restart.
//! Uses Moka for concurrent caching.

use moka::future::Cache;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::github::Repository;

/// Cache key for a repository listing
///
/// Listings are scoped per user so one account never sees another's
/// repositories. `query` is the normalized name filter from the request
/// query string (empty for the unfiltered list).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoListKey {
    pub user_id: i64,
    pub query: String,
}

impl RepoListKey {
    pub fn new(user_id: i64, query: Option<&str>) -> Self {
        Self {
            user_id,
            query: normalize_query(query),
        }
    }
}

/// Normalize a name filter: trimmed and lowercased, `None` and blank are equal
fn normalize_query(query: Option<&str>) -> String {
    query.map(str::trim).unwrap_or_default().to_lowercase()
}

// =============================================================================
// Repository listing cache
// =============================================================================

/// Repository listing cache (volatile, fixed TTL)
///
/// Entries expire a fixed time after insertion. Writes through the GitHub
/// API do not invalidate entries, so a listing can be stale for up to the TTL.
pub struct RepoListCache {
    listings: Cache<RepoListKey, Arc<Vec<Repository>>>,
}

impl RepoListCache {
    /// Create new repository listing cache
    ///
    /// # Arguments
    /// * `ttl` - How long a listing is served before it is fetched again
    /// * `max_entries` - Maximum number of listings kept
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        let listings = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { listings }
    }

    /// Get listing by key
    pub async fn get(&self, key: &RepoListKey) -> Option<Arc<Vec<Repository>>> {
        let result = self.listings.get(key).await;

        // Record cache hit/miss
        use crate::metrics::{CACHE_HITS_TOTAL, CACHE_MISSES_TOTAL};
        if result.is_some() {
            CACHE_HITS_TOTAL.with_label_values(&["repo_list"]).inc();
        } else {
            CACHE_MISSES_TOTAL.with_label_values(&["repo_list"]).inc();
        }

        result
    }

    /// Insert or replace a listing
    pub async fn insert(&self, key: RepoListKey, repositories: Arc<Vec<Repository>>) {
        self.listings.insert(key, repositories).await;

        // Update cache size metric
        use crate::metrics::CACHE_SIZE;
        CACHE_SIZE
            .with_label_values(&["repo_list"])
            .set(self.listings.entry_count() as i64);
    }

    /// Return the cached listing or compute, store and return it.
    ///
    /// Failed fetches are not cached.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: RepoListKey,
        fetch: F,
    ) -> Result<Arc<Vec<Repository>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Repository>, E>>,
    {
        if let Some(hit) = self.get(&key).await {
            tracing::debug!(user_id = key.user_id, query = %key.query, "Repository list cache hit");
            return Ok(hit);
        }

        tracing::debug!(user_id = key.user_id, query = %key.query, "Repository list cache miss");
        let repositories = Arc::new(fetch().await?);
        self.insert(key, repositories.clone()).await;
        Ok(repositories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::RepositoryOwner;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn repo(name: &str) -> Repository {
        Repository {
            id: 1,
            name: name.to_string(),
            full_name: format!("octocat/{name}"),
            owner: RepositoryOwner {
                login: "octocat".to_string(),
            },
            private: false,
            description: None,
            html_url: format!("https://github.com/octocat/{name}"),
            default_branch: Some("main".to_string()),
            updated_at: None,
        }
    }

    async fn fetch_counted(calls: &AtomicUsize) -> Result<Vec<Repository>, String> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![repo("hello")])
    }

    #[test]
    fn blank_and_missing_queries_share_a_key() {
        assert_eq!(RepoListKey::new(1, None), RepoListKey::new(1, Some("  ")));
        assert_eq!(
            RepoListKey::new(1, Some(" Rust ")),
            RepoListKey::new(1, Some("rust"))
        );
        assert_ne!(RepoListKey::new(1, None), RepoListKey::new(2, None));
    }

    #[tokio::test]
    async fn test_listing_is_served_from_cache_within_ttl() {
        let cache = RepoListCache::new(Duration::from_secs(60), 100);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let repos = cache
                .get_or_fetch(RepoListKey::new(7, None), || fetch_counted(&calls))
                .await
                .unwrap();
            assert_eq!(repos.len(), 1);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_listing_is_refetched_after_ttl() {
        let cache = RepoListCache::new(Duration::from_millis(100), 100);
        let calls = AtomicUsize::new(0);

        cache
            .get_or_fetch(RepoListKey::new(7, None), || fetch_counted(&calls))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        cache
            .get_or_fetch(RepoListKey::new(7, None), || fetch_counted(&calls))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let cache = RepoListCache::new(Duration::from_secs(60), 100);
        let calls = AtomicUsize::new(0);

        let failed: Result<_, String> = cache
            .get_or_fetch(RepoListKey::new(7, None), || async {
                Err("upstream down".to_string())
            })
            .await;
        assert!(failed.is_err());

        cache
            .get_or_fetch(RepoListKey::new(7, None), || fetch_counted(&calls))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
