//! PostgreSQL implementations of the collaborator ports.
//!
//! Thin adapters from the `damlink-core` store traits (and the DAM
//! token store) onto the repositories, mapping `sqlx::Error` into
//! `CoreError::Storage`.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use damlink_core::error::CoreError;
use damlink_core::record::LocalRecord;
use damlink_core::store::{AssetDataStore, ClaimedItem, RecordStore, StateStore, WorkQueue};
use damlink_core::types::DbId;
use damlink_dam::auth::{StoredTokens, TokenStore};

use crate::repositories::{AssetDataRepo, CredentialRepo, LocalRecordRepo, QueueRepo, StateRepo};

fn storage_err(e: sqlx::Error) -> CoreError {
    CoreError::Storage(e.to_string())
}

/// [`StateStore`] over the `sync_state` table.
pub struct PgStateStore {
    pool: PgPool,
}

impl PgStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StateStore for PgStateStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CoreError> {
        StateRepo::get(&self.pool, key).await.map_err(storage_err)
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), CoreError> {
        StateRepo::set(&self.pool, key, &value)
            .await
            .map_err(storage_err)
    }
}

/// [`AssetDataStore`] over the `asset_data` table.
pub struct PgAssetDataStore {
    pool: PgPool,
}

impl PgAssetDataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssetDataStore for PgAssetDataStore {
    async fn get(
        &self,
        asset_id: &str,
        data_key: &str,
    ) -> Result<Option<serde_json::Value>, CoreError> {
        AssetDataRepo::get(&self.pool, asset_id, data_key)
            .await
            .map_err(storage_err)
    }

    async fn set(
        &self,
        asset_id: &str,
        data_key: &str,
        value: serde_json::Value,
    ) -> Result<(), CoreError> {
        AssetDataRepo::set(&self.pool, asset_id, data_key, &value)
            .await
            .map_err(storage_err)
    }
}

/// [`RecordStore`] over the `local_records` table.
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn ids_referencing(
        &self,
        bundles: &[String],
        asset_ids: &[String],
    ) -> Result<Vec<DbId>, CoreError> {
        LocalRecordRepo::ids_referencing(&self.pool, bundles, asset_ids)
            .await
            .map_err(storage_err)
    }

    async fn load(&self, id: DbId) -> Result<Option<LocalRecord>, CoreError> {
        Ok(LocalRecordRepo::load(&self.pool, id)
            .await
            .map_err(storage_err)?
            .map(LocalRecord::from))
    }

    async fn apply_refresh(
        &self,
        id: DbId,
        last_upload_date: Option<&str>,
    ) -> Result<(), CoreError> {
        LocalRecordRepo::apply_refresh(&self.pool, id, last_upload_date)
            .await
            .map_err(storage_err)
    }
}

/// One named [`WorkQueue`] over the `queue_items` table.
pub struct PgQueue {
    pool: PgPool,
    queue_name: &'static str,
    visibility: Duration,
}

impl PgQueue {
    pub fn new(pool: PgPool, queue_name: &'static str, visibility: Duration) -> Self {
        Self {
            pool,
            queue_name,
            visibility,
        }
    }
}

#[async_trait]
impl WorkQueue for PgQueue {
    async fn push(&self, payload: serde_json::Value) -> Result<(), CoreError> {
        QueueRepo::push(&self.pool, self.queue_name, &payload)
            .await
            .map(|_| ())
            .map_err(storage_err)
    }

    async fn push_delayed(
        &self,
        payload: serde_json::Value,
        delay: Duration,
    ) -> Result<(), CoreError> {
        QueueRepo::push_delayed(&self.pool, self.queue_name, &payload, delay)
            .await
            .map(|_| ())
            .map_err(storage_err)
    }

    async fn claim(&self) -> Result<Option<ClaimedItem>, CoreError> {
        Ok(
            QueueRepo::claim_next(&self.pool, self.queue_name, self.visibility)
                .await
                .map_err(storage_err)?
                .map(|row| ClaimedItem {
                    id: row.id,
                    payload: row.payload,
                }),
        )
    }

    async fn delete(&self, item_id: DbId) -> Result<(), CoreError> {
        QueueRepo::delete(&self.pool, item_id)
            .await
            .map_err(storage_err)
    }

    async fn release(&self, item_id: DbId) -> Result<(), CoreError> {
        QueueRepo::release(&self.pool, item_id)
            .await
            .map_err(storage_err)
    }

    async fn count(&self) -> Result<i64, CoreError> {
        QueueRepo::count(&self.pool, self.queue_name)
            .await
            .map_err(storage_err)
    }

    async fn clear(&self) -> Result<(), CoreError> {
        QueueRepo::clear(&self.pool, self.queue_name)
            .await
            .map(|_| ())
            .map_err(storage_err)
    }
}

/// [`TokenStore`] persisting one user's OAuth tokens through the
/// credential repository.
pub struct PgTokenStore {
    pool: PgPool,
    namespace: String,
    user_id: String,
}

/// Credential key under which the token set is stored.
const TOKENS_KEY: &str = "oauth_tokens";

impl PgTokenStore {
    pub fn new(pool: PgPool, namespace: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
            user_id: user_id.into(),
        }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn load(&self) -> Result<Option<StoredTokens>, CoreError> {
        let value = CredentialRepo::get(&self.pool, &self.namespace, &self.user_id, TOKENS_KEY)
            .await
            .map_err(storage_err)?;
        match value {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| CoreError::Storage(format!("corrupt stored tokens: {e}"))),
        }
    }

    async fn save(&self, tokens: &StoredTokens) -> Result<(), CoreError> {
        let value = serde_json::to_value(tokens)
            .map_err(|e| CoreError::Internal(format!("serializing tokens: {e}")))?;
        CredentialRepo::set(&self.pool, &self.namespace, &self.user_id, TOKENS_KEY, &value)
            .await
            .map_err(storage_err)
    }

    async fn clear(&self) -> Result<(), CoreError> {
        CredentialRepo::delete(&self.pool, &self.namespace, &self.user_id, TOKENS_KEY)
            .await
            .map_err(storage_err)
    }
}
