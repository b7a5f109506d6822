//! The DAM operation trait.
//!
//! Every operation the sync engine delegates to the remote DAM is
//! listed here explicitly; [`crate::client::DamClient`] is the
//! production implementation and tests substitute doubles.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;

use damlink_core::types::Timestamp;

use crate::error::DamError;
use crate::types::{DamAsset, DownloadQueueStatus, NotificationsPage, SearchParams, SearchResults};

#[async_trait]
pub trait DamApi: Send + Sync {
    /// Fetch one asset. `expand` selects optional sub-resources; a
    /// fixed subset is always forced on because downstream logic
    /// depends on it.
    async fn get_asset(&self, id: &str, expand: &[&str]) -> Result<DamAsset, DamError>;

    /// Offset-paginated search over the catalog.
    async fn search_assets(&self, params: &SearchParams) -> Result<SearchResults, DamError>;

    /// Upload a local file as a new asset via the three-step presigned
    /// flow. Returns the new asset's id.
    async fn upload_asset(
        &self,
        file: &Path,
        filename: &str,
        folder_id: Option<&str>,
    ) -> Result<String, DamError>;

    /// Submit a server-side conversion job for the given assets.
    /// Returns the job's download key.
    async fn queue_asset_download(
        &self,
        asset_ids: &[String],
        options: &serde_json::Value,
    ) -> Result<String, DamError>;

    /// Poll a previously submitted conversion job.
    async fn download_from_queue(&self, key: &str) -> Result<DownloadQueueStatus, DamError>;

    /// Partial update of an asset's fields. Returns `Ok(false)` when
    /// the DAM rejects the edit with HTTP 409 (required metadata
    /// unmet) so callers can tell business-rule rejection from
    /// transport failure.
    async fn edit_asset(&self, id: &str, fields: &serde_json::Value) -> Result<bool, DamError>;

    /// Replace XMP metadata fields on an asset.
    async fn edit_asset_xmp(
        &self,
        id: &str,
        data: &HashMap<String, serde_json::Value>,
    ) -> Result<(), DamError>;

    /// Read an asset's structured metadata.
    async fn get_asset_metadata(
        &self,
        id: &str,
    ) -> Result<HashMap<String, serde_json::Value>, DamError>;

    /// One page of the notifications (delta) feed for the given window.
    async fn get_notifications(
        &self,
        limit: i64,
        offset: i64,
        starttime: Timestamp,
        endtime: Timestamp,
    ) -> Result<NotificationsPage, DamError>;
}
