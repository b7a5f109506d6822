//! Wire types for the DAM REST API.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use damlink_core::notification::{Notification, NotificationSource};

/// One remote asset as returned by the asset endpoints.
///
/// Date fields are kept as the wire strings; the engine never parses
/// them. `file_upload_date` strictly increases on each new version
/// uploaded to the DAM and is the version-change signal.
#[derive(Debug, Clone, Deserialize)]
pub struct DamAsset {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub filetype: String,
    #[serde(default)]
    pub datecreated: Option<String>,
    #[serde(default)]
    pub datemodified: Option<String>,
    #[serde(default)]
    pub date_deleted: Option<String>,
    #[serde(default)]
    pub file_upload_date: Option<String>,
    #[serde(default)]
    pub width: Option<i64>,
    #[serde(default)]
    pub height: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Embedded preview URLs keyed by size; each URL expires.
    #[serde(default)]
    pub thumbnails: HashMap<String, Thumbnail>,
    #[serde(default)]
    pub security: Option<SecurityBlock>,
    /// Free-form metadata fields.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Structured XMP metadata, present only when expanded.
    #[serde(default)]
    pub xmp_metadata: Option<HashMap<String, XmpField>>,
    /// Containing folder, when the DAM reports one.
    #[serde(default)]
    pub folder: Option<AssetFolder>,
}

/// Folder reference embedded in an asset payload.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetFolder {
    pub id: String,
}

/// A sized preview variant with an expiring URL.
#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    #[serde(default)]
    pub valid_until: Option<String>,
}

/// Release/expiration window and visibility flags on an asset.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityBlock {
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub expiration_date: Option<String>,
}

/// One XMP metadata field; only the value is carried over on copy.
#[derive(Debug, Clone, Deserialize)]
pub struct XmpField {
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

/// Flatten expanded XMP metadata to `{field: value}`, dropping fields
/// without a value.
pub fn flatten_xmp(xmp: &HashMap<String, XmpField>) -> HashMap<String, serde_json::Value> {
    xmp.iter()
        .filter_map(|(field, entry)| {
            entry
                .value
                .as_ref()
                .map(|value| (field.clone(), value.clone()))
        })
        .collect()
}

/// Parameters for the paginated asset search endpoint. The API is
/// offset-based; callers drive the pagination loop.
#[derive(Debug, Clone, Serialize)]
pub struct SearchParams {
    pub limit: i64,
    pub offset: i64,
    pub sortby: String,
    pub sortdir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<String>,
    /// Restrict the search to one folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
            sortby: "datecreated".into(),
            sortdir: "asc".into(),
            query: None,
            types: None,
            folder_id: None,
        }
    }
}

/// Result page from the search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResults {
    pub total_count: i64,
    #[serde(default)]
    pub assets: Vec<DamAsset>,
}

/// One page of the notifications (delta) feed.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsPage {
    #[serde(default)]
    pub last_read: Option<String>,
    pub offset: i64,
    pub limit: i64,
    pub total: i64,
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

/// Step-1 response of the presigned upload flow.
#[derive(Debug, Clone, Deserialize)]
pub struct PresignResponse {
    #[serde(default)]
    pub presigned_url: Option<String>,
    #[serde(default)]
    pub process_id: Option<String>,
}

/// Step-3 (confirm) response of the presigned upload flow.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmResponse {
    pub id: String,
}

/// Response to a download-queue (conversion job) submission.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueDownloadResponse {
    #[serde(default)]
    pub download_key: Option<String>,
}

/// Poll result for a download-queue job.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadQueueStatus {
    /// Top-level job status; everything other than `done` means the
    /// job is still being worked on.
    pub status: String,
    #[serde(default)]
    pub assets: Vec<DownloadQueueAsset>,
}

impl DownloadQueueStatus {
    pub fn is_done(&self) -> bool {
        self.status == "done"
    }

    /// The per-asset result for `asset_id`, if present.
    pub fn result_for(&self, asset_id: &str) -> Option<&DownloadQueueAsset> {
        self.assets.iter().find(|a| a.asset_id == asset_id)
    }
}

/// Per-asset entry inside a polled download-queue job.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadQueueAsset {
    pub asset_id: String,
    pub status: DownloadItemStatus,
    #[serde(default)]
    pub presigned_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Status of one asset within a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadItemStatus {
    Ready,
    Processing,
    Failed,
    #[serde(other)]
    Unknown,
}
