//! Collaborator ports.
//!
//! The sync engine owns no storage. These traits are the seams to the
//! host system's durable stores; `damlink-db` provides the PostgreSQL
//! implementations and tests substitute in-memory doubles.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::record::LocalRecord;
use crate::types::DbId;

/// Process-wide key-value state (holds the refresh cursor).
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CoreError>;
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), CoreError>;
}

/// Durable per-asset facts keyed by `(asset_id, data_key)`; holds
/// conversion completion records. (The last-synced upload-date marker
/// lives on the local record itself.)
#[async_trait]
pub trait AssetDataStore: Send + Sync {
    async fn get(
        &self,
        asset_id: &str,
        data_key: &str,
    ) -> Result<Option<serde_json::Value>, CoreError>;
    async fn set(
        &self,
        asset_id: &str,
        data_key: &str,
        value: serde_json::Value,
    ) -> Result<(), CoreError>;
}

/// Access to the host system's local records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Ids of records in any of `bundles` referencing any of
    /// `asset_ids`, deduplicated.
    async fn ids_referencing(
        &self,
        bundles: &[String],
        asset_ids: &[String],
    ) -> Result<Vec<DbId>, CoreError>;

    async fn load(&self, id: DbId) -> Result<Option<LocalRecord>, CoreError>;

    /// Apply a completed remote refresh: clear locally-mapped cached
    /// fields so they are re-derived on next use, mark the thumbnail
    /// stale, bump the changed timestamp, and record the upload-date
    /// marker.
    async fn apply_refresh(
        &self,
        id: DbId,
        last_upload_date: Option<&str>,
    ) -> Result<(), CoreError>;
}

/// An item claimed from a [`WorkQueue`]. The claim is invisible to
/// other consumers until deleted, released, or its visibility timeout
/// lapses.
#[derive(Debug, Clone)]
pub struct ClaimedItem {
    pub id: DbId,
    pub payload: serde_json::Value,
}

/// Durable at-least-once work queue.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn push(&self, payload: serde_json::Value) -> Result<(), CoreError>;
    async fn push_delayed(
        &self,
        payload: serde_json::Value,
        delay: std::time::Duration,
    ) -> Result<(), CoreError>;
    /// Claim the next available item, if any.
    async fn claim(&self) -> Result<Option<ClaimedItem>, CoreError>;
    async fn delete(&self, item_id: DbId) -> Result<(), CoreError>;
    /// Return a claimed item to the queue for immediate availability.
    async fn release(&self, item_id: DbId) -> Result<(), CoreError>;
    async fn count(&self) -> Result<i64, CoreError>;
    async fn clear(&self) -> Result<(), CoreError>;
}
