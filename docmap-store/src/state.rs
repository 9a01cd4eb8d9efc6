//! Processing state ledger
//!
//! Durable key/value store the pipeline uses to decide what still needs
//! processing (e.g. the last processed commit). The backing file may be wiped
//! by an external rebuild at any time: reads then report the key as absent and
//! the next write recreates the file and schema before persisting.

use chrono::{DateTime, Utc};
use docmap_common::db::ManagedPool;
use docmap_common::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Key under which the pipeline records the last commit it processed
pub const LAST_PROCESSED_COMMIT: &str = "last_processed_commit";

const STATE_SCHEMA: &[&str] = &[r#"
    CREATE TABLE IF NOT EXISTS processing_state (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#];

/// One ledger row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StateEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// SQLite-backed processing state ledger
pub struct StateStore {
    db: ManagedPool,
}

impl StateStore {
    /// Open (or create) the ledger at `path`
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let db = ManagedPool::open(path, STATE_SCHEMA).await?;
        Ok(Self { db })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        self.db.path()
    }

    /// Value stored under `key`, `None` if never written (or wiped)
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get_entry(key).await?.map(|entry| entry.value))
    }

    /// Full row for `key`, including when it was last written
    pub async fn get_entry(&self, key: &str) -> Result<Option<StateEntry>> {
        let Some(pool) = self.db.for_read().await? else {
            return Ok(None);
        };

        let entry = sqlx::query_as::<_, StateEntry>(
            "SELECT key, value, updated_at FROM processing_state WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&pool)
        .await?;

        Ok(entry)
    }

    /// Persist `value` under `key`, replacing any previous value
    ///
    /// Recreates the backing file and schema first if they were deleted.
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let pool = self.db.for_write().await?;

        sqlx::query(
            r#"
            INSERT INTO processing_state (key, value, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&pool)
        .await?;

        debug!(key, "Processing state updated");
        Ok(())
    }

    /// Delete `key`. Returns whether a row existed.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let pool = self.db.for_write().await?;

        let result = sqlx::query("DELETE FROM processing_state WHERE key = ?")
            .bind(key)
            .execute(&pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All rows ordered by key
    pub async fn entries(&self) -> Result<Vec<StateEntry>> {
        let Some(pool) = self.db.for_read().await? else {
            return Ok(Vec::new());
        };

        let entries = sqlx::query_as::<_, StateEntry>(
            "SELECT key, value, updated_at FROM processing_state ORDER BY key",
        )
        .fetch_all(&pool)
        .await?;

        Ok(entries)
    }

    /// Decode a JSON value stored with [`StateStore::set_json`]
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Store `value` as JSON under `key`
    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw).await
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::InvalidInput("state key must not be empty".to_string()));
    }
    Ok(())
}
