// ABOUTME: Sqlite-backed implementation of the on-device key-value store
// ABOUTME: Single kv_entries table with schema created on connect
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Stride Fitness

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use super::LocalStore;
use crate::errors::{AppError, AppResult};

/// Sqlite-backed key-value store
///
/// The production stand-in for the device's storage: one `kv_entries` table
/// keyed by the same device-scoped strings the mobile app used. Supports
/// `sqlite::memory:` URLs for ephemeral use.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the store at the given `sqlite:` URL
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be created
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let in_memory = database_url.contains(":memory:");
        let connection_options = if in_memory {
            database_url.to_owned()
        } else if database_url.starts_with("sqlite:") {
            format!("{database_url}?mode=rwc")
        } else {
            format!("sqlite:{database_url}?mode=rwc")
        };

        // An in-memory database exists per connection, so the pool must not
        // hand out a second one
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .connect(&connection_options)
            .await
            .map_err(|e| AppError::storage(format!("Failed to open local store: {e}")))?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Create the schema if it does not exist yet
    async fn migrate(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS kv_entries (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::storage(format!("Failed to create kv_entries table: {e}")))?;

        Ok(())
    }

    /// Access the underlying pool (test helper)
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl LocalStore for SqliteStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_entries WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::storage(format!("Failed to read key {key}: {e}")))?;

        row.map(|r| {
            r.try_get::<String, _>("value")
                .map_err(|e| AppError::storage(format!("Failed to decode value for {key}: {e}")))
        })
        .transpose()
    }

    async fn put(&self, key: &str, value: &str) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO kv_entries (key, value, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::storage(format!("Failed to write key {key}: {e}")))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM kv_entries WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::storage(format!("Failed to delete key {key}: {e}")))?;

        Ok(())
    }

    async fn keys(&self, prefix: &str) -> AppResult<Vec<String>> {
        // LIKE with a trailing % matches the prefix; escape the LIKE
        // metacharacters that may appear in device ids
        let pattern = format!(
            "{}%",
            prefix.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
        );

        let rows = sqlx::query(
            "SELECT key FROM kv_entries WHERE key LIKE $1 ESCAPE '\\' ORDER BY key ASC",
        )
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::storage(format!("Failed to list keys for {prefix}: {e}")))?;

        rows.into_iter()
            .map(|r| {
                r.try_get::<String, _>("key")
                    .map_err(|e| AppError::storage(format!("Failed to decode key: {e}")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    async fn ephemeral_store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_get_put_round_trip() {
        let store = ephemeral_store().await;

        assert_eq!(store.get("stride_measurements_d1").await.unwrap(), None);

        store.put("stride_measurements_d1", "[]").await.unwrap();
        assert_eq!(
            store.get("stride_measurements_d1").await.unwrap().as_deref(),
            Some("[]")
        );

        store.put("stride_measurements_d1", "[1]").await.unwrap();
        assert_eq!(
            store.get("stride_measurements_d1").await.unwrap().as_deref(),
            Some("[1]")
        );
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = ephemeral_store().await;

        store.put("k", "v").await.unwrap();
        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_keys_prefix_filtering() {
        let store = ephemeral_store().await;

        store.put("stride_backup_d1_a", "{}").await.unwrap();
        store.put("stride_backup_d1_b", "{}").await.unwrap();
        store.put("stride_backup_d2_a", "{}").await.unwrap();
        store.put("unrelated", "{}").await.unwrap();

        let keys = store.keys("stride_backup_d1").await.unwrap();
        assert_eq!(keys, vec!["stride_backup_d1_a", "stride_backup_d1_b"]);
    }

    #[tokio::test]
    async fn test_keys_escapes_like_metacharacters() {
        let store = ephemeral_store().await;

        // An underscore in the prefix must match literally, not as a wildcard
        store.put("stride_a_1", "{}").await.unwrap();
        store.put("strideXaX1", "{}").await.unwrap();

        let keys = store.keys("stride_a_").await.unwrap();
        assert_eq!(keys, vec!["stride_a_1"]);
    }
}
