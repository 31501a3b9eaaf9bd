//! Persistence of resolved series links.
//!
//! The engine itself never writes here; callers save links after a batch
//! completes and read [`SeriesStore::existing_keys`] back as the
//! "already resolved" exclusion set for the next run.

mod error;

pub use error::{StoreError, StoreErrorKind};

use std::collections::HashSet;
use std::time::Duration;

use sqlx::FromRow;
use tracing::{debug, instrument, warn};

use crate::db::Database;
use crate::request::{ResolutionRequest, SeriesLink};

/// Attempts per write while `SQLite` reports busy/locked.
const BUSY_RETRY_ATTEMPTS: u32 = 3;
/// Backoff step between busy retries; grows linearly with the attempt.
const BUSY_RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Runs `op`, retrying while it fails with a busy/locked database error.
async fn retry_when_busy<T, F, Fut>(mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(error) if error.is_busy_or_locked() && attempt < BUSY_RETRY_ATTEMPTS => {
                warn!(
                    attempt,
                    kind = ?error.database_kind(),
                    error = %error,
                    "store busy; retrying write"
                );
                tokio::time::sleep(BUSY_RETRY_BACKOFF * attempt).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// One stored row.
#[derive(Debug, Clone, FromRow)]
struct BookSeriesRow {
    request_key: String,
    title: String,
    author: Option<String>,
    isbn: Option<String>,
    series_name: String,
    series_position: Option<i64>,
    entity_id: String,
    series_id: String,
    created_at: String,
}

/// A stored request with its series link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLink {
    /// Request key the link was saved under.
    pub key: String,
    /// Title as submitted.
    pub title: String,
    /// Author as submitted.
    pub author: Option<String>,
    /// ISBN as submitted.
    pub isbn: Option<String>,
    /// The resolved link.
    pub link: SeriesLink,
    /// `SQLite` timestamp of the save.
    pub created_at: String,
}

impl TryFrom<BookSeriesRow> for StoredLink {
    type Error = StoreError;

    fn try_from(row: BookSeriesRow) -> Result<Self, Self::Error> {
        let series_position = row
            .series_position
            .map(u32::try_from)
            .transpose()
            .map_err(|_| StoreError::CorruptRow {
                key: row.request_key.clone(),
                reason: "series_position out of range".to_string(),
            })?;
        Ok(Self {
            key: row.request_key,
            title: row.title,
            author: row.author,
            isbn: row.isbn,
            link: SeriesLink {
                entity_id: row.entity_id,
                series_id: row.series_id,
                series_name: row.series_name,
                series_position,
            },
            created_at: row.created_at,
        })
    }
}

/// Series links keyed by request key.
#[derive(Debug, Clone)]
pub struct SeriesStore {
    db: Database,
}

impl SeriesStore {
    /// Creates a store over an open database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Keys that already have a stored link.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] when the query fails.
    #[instrument(skip(self))]
    pub async fn existing_keys(&self) -> Result<HashSet<String>, StoreError> {
        let keys: Vec<(String,)> = sqlx::query_as("SELECT request_key FROM book_series")
            .fetch_all(self.db.pool())
            .await?;
        debug!(count = keys.len(), "loaded existing keys");
        Ok(keys.into_iter().map(|(key,)| key).collect())
    }

    /// Saves `link` for `request`, replacing any previous link for its key.
    ///
    /// A write that hits a busy or locked database is retried a few times
    /// with a short backoff before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] when the write fails.
    #[instrument(skip(self, request, link), fields(key = %request.key))]
    pub async fn save_link(
        &self,
        request: &ResolutionRequest,
        link: &SeriesLink,
    ) -> Result<(), StoreError> {
        retry_when_busy(|| self.upsert(request, link)).await
    }

    async fn upsert(&self, request: &ResolutionRequest, link: &SeriesLink) -> Result<(), StoreError> {
        sqlx::query(
            r"INSERT OR REPLACE INTO book_series
                (request_key, title, author, isbn, series_name, series_position, entity_id, series_id)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.key)
        .bind(&request.title)
        .bind(&request.author)
        .bind(&request.isbn)
        .bind(&link.series_name)
        .bind(link.series_position.map(i64::from))
        .bind(&link.entity_id)
        .bind(&link.series_id)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Number of stored links.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] when the query fails.
    pub async fn count(&self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM book_series")
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    /// Returns the stored link for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails or the row is corrupt.
    pub async fn get(&self, key: &str) -> Result<Option<StoredLink>, StoreError> {
        let row = sqlx::query_as::<_, BookSeriesRow>(
            r"SELECT request_key, title, author, isbn, series_name, series_position,
                     entity_id, series_id, created_at
              FROM book_series WHERE request_key = ?",
        )
        .bind(key)
        .fetch_optional(self.db.pool())
        .await?;
        row.map(StoredLink::try_from).transpose()
    }
}
