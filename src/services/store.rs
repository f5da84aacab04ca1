use crate::db::LinkRepository;
use crate::error::{AppError, AppResult};
use crate::services::short_code::CodeGenerator;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use url::Url;

/// Extra hex characters added to candidates once the first half of the
/// retry budget has been spent on collisions.
const WIDENED_LENGTH_STEP: usize = 4;

/// The URL store: owns all link records and the invariants around them.
///
/// Uniqueness of short codes is enforced by the repository's unique index;
/// the store turns insert-time collisions into internal retries. Expiry is
/// enforced lazily by passing a liveness cutoff to every read, so neither
/// `resolve` nor the shorten idempotency check can ever see a record older
/// than the retention window, independent of sweeper timing.
#[derive(Clone)]
pub struct UrlStore {
    repository: Arc<dyn LinkRepository>,
    retention: Duration,
    code_length: usize,
    max_attempts: u32,
}

impl UrlStore {
    pub fn new(
        repository: Arc<dyn LinkRepository>,
        retention_seconds: i64,
        code_length: usize,
        max_attempts: u32,
    ) -> Self {
        Self {
            repository,
            retention: Duration::seconds(retention_seconds),
            code_length,
            max_attempts,
        }
    }

    /// Shorten a URL, returning its short code.
    ///
    /// Re-shortening the exact same URL string is idempotent and returns the
    /// existing code. Equality is byte-for-byte; no normalization, so
    /// `http://a.com/` and `http://a.com` mint separate codes.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the URL is empty or missing
    /// - `InvalidUrl` if it does not parse as an absolute URL
    /// - `AllocationExhausted` if no free code is found within the attempt
    ///   budget
    pub async fn shorten(&self, url: &str) -> AppResult<String> {
        if url.is_empty() {
            return Err(AppError::InvalidInput);
        }

        // Syntax only: any recognized scheme, no reachability check.
        Url::parse(url).map_err(|_| AppError::InvalidUrl(url.to_string()))?;

        let cutoff = self.cutoff();

        if let Some(existing) = self.repository.find_live_by_url(url, cutoff).await? {
            tracing::debug!(code = %existing.short_code, "URL already known, reusing code");
            return Ok(existing.short_code);
        }

        // Two concurrent calls for the same new URL can both reach this
        // point and both insert; the idempotency check above is best-effort
        // and only code uniqueness is a hard constraint.
        for attempt in 0..self.max_attempts {
            let length = if attempt < self.max_attempts.div_ceil(2) {
                self.code_length
            } else {
                self.code_length + WIDENED_LENGTH_STEP
            };
            let candidate = CodeGenerator::generate(length);

            // An expired record can still occupy a code in storage until the
            // sweeper reclaims it; the unique index treats that as taken, so
            // the loop simply moves on to the next candidate.
            if self
                .repository
                .find_live_by_code(&candidate, cutoff)
                .await?
                .is_some()
            {
                continue;
            }

            match self
                .repository
                .insert_link(&candidate, url, Utc::now())
                .await
            {
                Ok(link) => return Ok(link.short_code),
                Err(AppError::CodeCollision(code)) => {
                    // Lost the insert race to a concurrent request.
                    tracing::warn!(code = %code, attempt, "short code collision, retrying");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::AllocationExhausted(self.max_attempts))
    }

    /// Resolve a short code to its original URL.
    ///
    /// Pure read. The code is not validated against the generator's format;
    /// any string that misses the index, or matches only an expired record,
    /// fails with `NotFound`. The stored URL is returned unmodified.
    pub async fn resolve(&self, short_code: &str) -> AppResult<String> {
        let link = self
            .repository
            .find_live_by_code(short_code, self.cutoff())
            .await?
            .ok_or_else(|| AppError::NotFound(short_code.to_string()))?;

        Ok(link.original_url)
    }

    /// Delete all records older than the retention window.
    ///
    /// Storage reclamation only; liveness filtering in the read paths is
    /// what guarantees expired records are never served.
    pub async fn purge_expired(&self) -> AppResult<u64> {
        self.repository.delete_expired(self.cutoff()).await
    }

    fn cutoff(&self) -> DateTime<Utc> {
        Utc::now() - self.retention
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryRepository;
    use crate::models::Link;
    use async_trait::async_trait;

    const RETENTION_SECONDS: i64 = 2_592_000;

    fn store_with(repository: Arc<dyn LinkRepository>) -> UrlStore {
        UrlStore::new(repository, RETENTION_SECONDS, 8, 10)
    }

    fn memory_store() -> (Arc<MemoryRepository>, UrlStore) {
        let repo = Arc::new(MemoryRepository::new());
        let store = store_with(repo.clone());
        (repo, store)
    }

    #[tokio::test]
    async fn test_shorten_round_trip() {
        let (_, store) = memory_store();

        let code = store.shorten("https://example.com").await.unwrap();
        assert_eq!(code.len(), 8);

        let url = store.resolve(&code).await.unwrap();
        assert_eq!(url, "https://example.com");
    }

    #[tokio::test]
    async fn test_shorten_is_idempotent() {
        let (_, store) = memory_store();

        let first = store.shorten("https://example.com/page").await.unwrap();
        let second = store.shorten("https://example.com/page").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_shorten_no_url_normalization() {
        let (_, store) = memory_store();

        let with_slash = store.shorten("http://a.com/").await.unwrap();
        let without_slash = store.shorten("http://a.com").await.unwrap();
        assert_ne!(with_slash, without_slash);
    }

    #[tokio::test]
    async fn test_shorten_rejects_empty_input() {
        let (_, store) = memory_store();

        let err = store.shorten("").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput));
    }

    #[tokio::test]
    async fn test_shorten_rejects_malformed_url() {
        let (_, store) = memory_store();

        let err = store.shorten("not a url").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_shorten_accepts_any_scheme() {
        let (_, store) = memory_store();

        // No scheme allow-list: anything parseable as an absolute URL works.
        assert!(store.shorten("ftp://files.example.com").await.is_ok());
    }

    #[tokio::test]
    async fn test_resolve_unknown_code_not_found() {
        let (_, store) = memory_store();

        let err = store.resolve("doesnotexist").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_expired_record_behaves_as_nonexistent() {
        let (repo, store) = memory_store();

        let stale = Utc::now() - Duration::seconds(RETENTION_SECONDS + 60);
        repo.insert_link("old12345", "https://old.example", stale)
            .await
            .unwrap();

        // Resolve must treat the record as gone.
        let err = store.resolve("old12345").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        // The idempotency check must not resurrect the expired code.
        let fresh = store.shorten("https://old.example").await.unwrap();
        assert_ne!(fresh, "old12345");
    }

    #[tokio::test]
    async fn test_purge_expired_removes_only_stale_records() {
        let (repo, store) = memory_store();

        let stale = Utc::now() - Duration::seconds(RETENTION_SECONDS + 60);
        repo.insert_link("old12345", "https://old.example", stale)
            .await
            .unwrap();
        let live = store.shorten("https://live.example").await.unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.resolve(&live).await.unwrap(), "https://live.example");
    }

    #[tokio::test]
    async fn test_concurrent_shorten_distinct_urls_distinct_codes() {
        let (_, store) = memory_store();

        let mut handles = Vec::new();
        for i in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.shorten(&format!("https://example.com/{}", i)).await
            }));
        }

        let mut codes = std::collections::HashSet::new();
        for handle in handles {
            let code = handle.await.unwrap().unwrap();
            assert!(codes.insert(code), "duplicate short code allocated");
        }
        assert_eq!(codes.len(), 50);
    }

    /// Repository whose inserts always lose the uniqueness race.
    struct CollidingRepository;

    #[async_trait]
    impl LinkRepository for CollidingRepository {
        async fn insert_link(
            &self,
            short_code: &str,
            _original_url: &str,
            _created_at: DateTime<Utc>,
        ) -> AppResult<Link> {
            Err(AppError::CodeCollision(short_code.to_string()))
        }

        async fn find_live_by_code(
            &self,
            _short_code: &str,
            _cutoff: DateTime<Utc>,
        ) -> AppResult<Option<Link>> {
            Ok(None)
        }

        async fn find_live_by_url(
            &self,
            _original_url: &str,
            _cutoff: DateTime<Utc>,
        ) -> AppResult<Option<Link>> {
            Ok(None)
        }

        async fn delete_expired(&self, _cutoff: DateTime<Utc>) -> AppResult<u64> {
            Ok(0)
        }

        async fn ping(&self) -> AppResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_allocation_exhausts_after_bounded_retries() {
        let store = store_with(Arc::new(CollidingRepository));

        let err = store.shorten("https://example.com").await.unwrap_err();
        assert!(matches!(err, AppError::AllocationExhausted(10)));
    }
}
