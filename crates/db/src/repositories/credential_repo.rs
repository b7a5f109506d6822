//! Repository for the `user_credentials` table (per-user OAuth tokens).

use sqlx::PgPool;

/// Provides access to per-user credential values keyed by
/// `(namespace, user_id, cred_key)`.
pub struct CredentialRepo;

impl CredentialRepo {
    pub async fn get(
        pool: &PgPool,
        namespace: &str,
        user_id: &str,
        cred_key: &str,
    ) -> Result<Option<serde_json::Value>, sqlx::Error> {
        sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT value FROM user_credentials \
             WHERE namespace = $1 AND user_id = $2 AND cred_key = $3",
        )
        .bind(namespace)
        .bind(user_id)
        .bind(cred_key)
        .fetch_optional(pool)
        .await
    }

    pub async fn set(
        pool: &PgPool,
        namespace: &str,
        user_id: &str,
        cred_key: &str,
        value: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_credentials (namespace, user_id, cred_key, value) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (namespace, user_id, cred_key) \
             DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(namespace)
        .bind(user_id)
        .bind(cred_key)
        .bind(value)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(
        pool: &PgPool,
        namespace: &str,
        user_id: &str,
        cred_key: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "DELETE FROM user_credentials \
             WHERE namespace = $1 AND user_id = $2 AND cred_key = $3",
        )
        .bind(namespace)
        .bind(user_id)
        .bind(cred_key)
        .execute(pool)
        .await?;
        Ok(())
    }
}
