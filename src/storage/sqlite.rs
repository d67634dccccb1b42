use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use super::{KeyValueStore, MIGRATION_001_KV_STORE};

/// Key-value store backed by a single SQLite table.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_KV_STORE)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let store = Self::connect(database_url).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// List stored keys, mostly for diagnostics.
    pub async fn keys(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT key FROM kv_store ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list keys")?;
        Ok(rows.iter().map(|row| row.get("key")).collect())
    }
}

impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read key '{}'", key))?;

        Ok(row.map(|row| row.get("value")))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to write key '{}'", key))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to remove key '{}'", key))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    async fn temp_store() -> Result<(SqliteStore, TempDir)> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("kv.db");
        let url = format!("sqlite:{}?mode=rwc", db_path.display());
        Ok((SqliteStore::init(&url).await?, temp_dir))
    }

    #[tokio::test]
    async fn test_set_get_overwrite_remove() -> Result<()> {
        let (store, _temp) = temp_store().await?;

        assert_eq!(store.get("group-data").await?, None);
        store.set("group-data", "{\"a\":1}").await?;
        store.set("group-data", "{\"a\":2}").await?;
        assert_eq!(store.get("group-data").await?.as_deref(), Some("{\"a\":2}"));
        assert_eq!(store.keys().await?, vec!["group-data".to_string()]);

        store.remove("group-data").await?;
        assert_eq!(store.get("group-data").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_migrate_is_repeatable() -> Result<()> {
        let (store, _temp) = temp_store().await?;
        store.set("k", "v").await?;
        store.migrate().await?;
        assert_eq!(store.get("k").await?.as_deref(), Some("v"));
        Ok(())
    }
}
