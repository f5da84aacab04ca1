use crate::error::{AppError, AppResult};
use crate::models::Link;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    ConnectOptions, PgPool,
};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

/// Storage seam for link records.
///
/// Every read takes a liveness `cutoff`: records created at or before the
/// cutoff are expired and must behave as nonexistent, regardless of whether
/// the sweeper has physically removed them yet.
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Insert a new link. Fails with `CodeCollision` when the short code is
    /// already taken (unique index rejected the row).
    async fn insert_link(
        &self,
        short_code: &str,
        original_url: &str,
        created_at: DateTime<Utc>,
    ) -> AppResult<Link>;

    /// Exact-match lookup by short code, restricted to live records.
    async fn find_live_by_code(
        &self,
        short_code: &str,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Option<Link>>;

    /// Exact string match on the original URL, restricted to live records.
    /// No normalization: `http://a.com/` and `http://a.com` are distinct.
    async fn find_live_by_url(
        &self,
        original_url: &str,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Option<Link>>;

    /// Hard-delete records older than the cutoff. Returns the purge count.
    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;

    /// Connectivity probe for health checks.
    async fn ping(&self) -> AppResult<()>;
}

/// PostgreSQL repository
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    /// Create a new repository with a connection pool
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout_seconds: u64,
    ) -> AppResult<Self> {
        let options = PgConnectOptions::from_str(database_url)
            .map_err(|e| AppError::Configuration(format!("Invalid database URL: {}", e)))?
            .disable_statement_logging();

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(acquire_timeout_seconds))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl LinkRepository for PgRepository {
    async fn insert_link(
        &self,
        short_code: &str,
        original_url: &str,
        created_at: DateTime<Utc>,
    ) -> AppResult<Link> {
        let result = sqlx::query_as::<_, Link>(
            r#"
            INSERT INTO links (short_code, original_url, created_at)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(short_code)
        .bind(original_url)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(link) => Ok(link),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::CodeCollision(short_code.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_live_by_code(
        &self,
        short_code: &str,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Option<Link>> {
        let result = sqlx::query_as::<_, Link>(
            r#"
            SELECT * FROM links
            WHERE short_code = $1 AND created_at > $2
            "#,
        )
        .bind(short_code)
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }

    async fn find_live_by_url(
        &self,
        original_url: &str,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Option<Link>> {
        let result = sqlx::query_as::<_, Link>(
            r#"
            SELECT * FROM links
            WHERE original_url = $1 AND created_at > $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(original_url)
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM links WHERE created_at <= $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// In-memory repository keyed by short code.
///
/// Backs the test suite and local experiments; it upholds the same contract
/// as `PgRepository`, including the collision failure on duplicate codes.
#[derive(Default)]
pub struct MemoryRepository {
    links: RwLock<HashMap<String, Link>>,
    next_id: AtomicI64,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LinkRepository for MemoryRepository {
    async fn insert_link(
        &self,
        short_code: &str,
        original_url: &str,
        created_at: DateTime<Utc>,
    ) -> AppResult<Link> {
        let mut links = self
            .links
            .write()
            .map_err(|_| AppError::Internal("links lock poisoned".to_string()))?;

        if links.contains_key(short_code) {
            return Err(AppError::CodeCollision(short_code.to_string()));
        }

        let link = Link {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            short_code: short_code.to_string(),
            original_url: original_url.to_string(),
            created_at,
        };
        links.insert(short_code.to_string(), link.clone());

        Ok(link)
    }

    async fn find_live_by_code(
        &self,
        short_code: &str,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Option<Link>> {
        let links = self
            .links
            .read()
            .map_err(|_| AppError::Internal("links lock poisoned".to_string()))?;

        Ok(links
            .get(short_code)
            .filter(|link| link.created_at > cutoff)
            .cloned())
    }

    async fn find_live_by_url(
        &self,
        original_url: &str,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Option<Link>> {
        let links = self
            .links
            .read()
            .map_err(|_| AppError::Internal("links lock poisoned".to_string()))?;

        Ok(links
            .values()
            .filter(|link| link.original_url == original_url && link.created_at > cutoff)
            .max_by_key(|link| link.created_at)
            .cloned())
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let mut links = self
            .links
            .write()
            .map_err(|_| AppError::Internal("links lock poisoned".to_string()))?;

        let before = links.len();
        links.retain(|_, link| link.created_at > cutoff);

        Ok((before - links.len()) as u64)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[tokio::test]
    async fn test_memory_insert_and_lookup() {
        let repo = MemoryRepository::new();
        let now = Utc::now();
        let cutoff = now - ChronoDuration::days(30);

        let link = repo
            .insert_link("abc12345", "https://example.com", now)
            .await
            .unwrap();
        assert_eq!(link.short_code, "abc12345");

        let found = repo.find_live_by_code("abc12345", cutoff).await.unwrap();
        assert_eq!(found.unwrap().original_url, "https://example.com");

        let found = repo
            .find_live_by_url("https://example.com", cutoff)
            .await
            .unwrap();
        assert_eq!(found.unwrap().short_code, "abc12345");
    }

    #[tokio::test]
    async fn test_memory_duplicate_code_collides() {
        let repo = MemoryRepository::new();
        let now = Utc::now();

        repo.insert_link("abc12345", "https://example.com", now)
            .await
            .unwrap();
        let err = repo
            .insert_link("abc12345", "https://other.example", now)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::CodeCollision(_)));
    }

    #[tokio::test]
    async fn test_memory_cutoff_hides_expired() {
        let repo = MemoryRepository::new();
        let now = Utc::now();
        let cutoff = now - ChronoDuration::days(30);
        let stale = now - ChronoDuration::days(31);

        repo.insert_link("old12345", "https://old.example", stale)
            .await
            .unwrap();

        assert!(repo
            .find_live_by_code("old12345", cutoff)
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .find_live_by_url("https://old.example", cutoff)
            .await
            .unwrap()
            .is_none());

        let purged = repo.delete_expired(cutoff).await.unwrap();
        assert_eq!(purged, 1);
    }
}
