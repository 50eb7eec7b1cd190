//! Settings documents stored as JSONB.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use super::PgStore;
use crate::db::{RepoResult, SettingsStore};

#[async_trait]
impl SettingsStore for PgStore {
    async fn get(&self, key: &str) -> RepoResult<Option<JsonValue>> {
        let value = sqlx::query_scalar::<_, JsonValue>("SELECT value FROM settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: JsonValue) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = NOW()
            ",
        )
        .bind(key)
        .bind(&value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn replace(
        &self,
        key: &str,
        expected: Option<&JsonValue>,
        value: JsonValue,
    ) -> RepoResult<bool> {
        let result = match expected {
            None => {
                sqlx::query(
                    r"
                    INSERT INTO settings (key, value)
                    VALUES ($1, $2)
                    ON CONFLICT (key) DO NOTHING
                    ",
                )
                .bind(key)
                .bind(&value)
                .execute(&self.pool)
                .await?
            }
            Some(expected) => {
                sqlx::query(
                    r"
                    UPDATE settings
                    SET value = $3, updated_at = NOW()
                    WHERE key = $1 AND value = $2
                    ",
                )
                .bind(key)
                .bind(expected)
                .bind(&value)
                .execute(&self.pool)
                .await?
            }
        };
        Ok(result.rows_affected() == 1)
    }
}
