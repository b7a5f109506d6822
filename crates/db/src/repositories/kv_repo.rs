//! Key-value repositories: process-wide sync state and per-asset data.

use sqlx::PgPool;

/// Provides access to the `sync_state` table (one JSON value per key;
/// holds the refresh cursor).
pub struct StateRepo;

impl StateRepo {
    pub async fn get(
        pool: &PgPool,
        state_key: &str,
    ) -> Result<Option<serde_json::Value>, sqlx::Error> {
        sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT value FROM sync_state WHERE state_key = $1",
        )
        .bind(state_key)
        .fetch_optional(pool)
        .await
    }

    pub async fn set(
        pool: &PgPool,
        state_key: &str,
        value: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO sync_state (state_key, value) VALUES ($1, $2) \
             ON CONFLICT (state_key) \
             DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(state_key)
        .bind(value)
        .execute(pool)
        .await?;
        Ok(())
    }
}

/// Provides access to the `asset_data` table (durable per-asset facts;
/// currently conversion completion records).
pub struct AssetDataRepo;

impl AssetDataRepo {
    pub async fn get(
        pool: &PgPool,
        asset_id: &str,
        data_key: &str,
    ) -> Result<Option<serde_json::Value>, sqlx::Error> {
        sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT value FROM asset_data WHERE asset_id = $1 AND data_key = $2",
        )
        .bind(asset_id)
        .bind(data_key)
        .fetch_optional(pool)
        .await
    }

    pub async fn set(
        pool: &PgPool,
        asset_id: &str,
        data_key: &str,
        value: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO asset_data (asset_id, data_key, value) VALUES ($1, $2, $3) \
             ON CONFLICT (asset_id, data_key) \
             DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(asset_id)
        .bind(data_key)
        .bind(value)
        .execute(pool)
        .await?;
        Ok(())
    }
}
