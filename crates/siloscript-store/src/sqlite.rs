use sqlx::SqlitePool;

use crate::{Store, StoreError};

/// A durable [`Store`] backed by a single SQLite table, one row per
/// `(user, silo, key)`, with writes immediately durable.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePool::connect(url).await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                created TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                user TEXT NOT NULL,
                silo TEXT NOT NULL,
                key TEXT NOT NULL,
                value BLOB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS entries_user_silo_key
            ON entries (user, silo, key)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl Store for SqliteStore {
    async fn get(&self, user: &str, silo: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let row: Option<(Vec<u8>,)> =
            sqlx::query_as("SELECT value FROM entries WHERE user = ? AND silo = ? AND key = ?")
                .bind(user)
                .bind(silo)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(value,)| value).ok_or(StoreError::NotFound)
    }

    async fn put(
        &self,
        user: &str,
        silo: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO entries (user, silo, key, value) VALUES (?, ?, ?, ?)
            ON CONFLICT (user, silo, key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(user)
        .bind(silo)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, user: &str, silo: &str, key: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM entries WHERE user = ? AND silo = ? AND key = ?")
            .bind(user)
            .bind(silo)
            .bind(key)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
