//! SQLite-backed [`KvStore`], so a session survives process restarts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tokio::sync::Mutex;

use crate::store::{expiry_after, KvStore, StoreError};

/// Durable key-value store with per-entry expiry.
///
/// The database is opened lazily on first use. Cloning is cheap and shares
/// the same pool.
#[derive(Debug, Clone)]
pub struct SqliteKvStore {
    path: PathBuf,
    pool: Arc<Mutex<Option<SqlitePool>>>,
}

impl SqliteKvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pool: Arc::new(Mutex::new(None)),
        }
    }

    /// Store at `{app_data_dir}/marketadmin/session.db`.
    pub fn at_default_path() -> anyhow::Result<Self> {
        Ok(Self::new(default_db_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn get_pool(&self) -> anyhow::Result<SqlitePool> {
        let mut pool_guard = self.pool.lock().await;
        if let Some(pool) = pool_guard.as_ref() {
            return Ok(pool.clone());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create session store directory at {:?}", parent))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open session store at {:?}", self.path))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_entries (
                key        TEXT PRIMARY KEY NOT NULL,
                value      TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .context("failed to create kv_entries table")?;

        *pool_guard = Some(pool.clone());
        Ok(pool)
    }

    async fn get_entry(&self, key: &str) -> anyhow::Result<Option<String>> {
        let pool = self.get_pool().await?;

        let row = sqlx::query(
            r#"
            SELECT value, expires_at
            FROM kv_entries
            WHERE key = ?1
            "#,
        )
        .bind(key)
        .fetch_optional(&pool)
        .await
        .context("failed to read kv entry")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let value: String = row.try_get("value")?;
        let expires_at_str: String = row.try_get("expires_at")?;
        let expires_at = DateTime::parse_from_rfc3339(&expires_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .context("invalid expires_at timestamp in session store")?;

        if expires_at <= Utc::now() {
            self.remove_entry(key).await?;
            return Ok(None);
        }

        Ok(Some(value))
    }

    async fn set_entry(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()> {
        let expires_at = expiry_after(ttl)?.to_rfc3339();
        let pool = self.get_pool().await?;

        sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value, expires_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key)
            DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(&expires_at)
        .execute(&pool)
        .await
        .context("failed to upsert kv entry")?;

        Ok(())
    }

    async fn remove_entry(&self, key: &str) -> anyhow::Result<()> {
        let pool = self.get_pool().await?;

        sqlx::query(
            r#"
            DELETE FROM kv_entries
            WHERE key = ?1
            "#,
        )
        .bind(key)
        .execute(&pool)
        .await
        .context("failed to delete kv entry")?;

        Ok(())
    }
}

fn backend(err: anyhow::Error) -> StoreError {
    StoreError::Backend(format!("{err:#}"))
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.get_entry(key).await.map_err(backend)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.set_entry(key, value, ttl).await.map_err(backend)
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.remove_entry(key).await.map_err(backend)
    }
}

/// Resolve `{app_data_dir}/marketadmin/session.db`.
pub fn default_db_path() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")?;

    let mut path = base;
    path.push("marketadmin");
    path.push("session.db");
    Ok(path)
}
