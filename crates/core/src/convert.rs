//! Queue item for the multi-stage format-conversion workflow.
//!
//! A conversion runs as `queue_download` → `check_upload` →
//! `update_metadata`, one stage per dequeue, with the item re-enqueued
//! between stages. The item carries all stage progress so processing
//! survives across cron runs; stages only ever move forward.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Give up polling a conversion job after this many checks.
pub const MAX_POLL_ATTEMPTS: u32 = 10;

/// Stage of the conversion workflow. Variant order is the execution
/// order; transitions are strictly forward.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ConvertStage {
    /// Ask the DAM to produce the converted rendition.
    #[default]
    QueueDownload,
    /// Poll the conversion job, then upload the result as a new asset.
    CheckUpload,
    /// Copy description, status, and XMP metadata onto the new asset.
    UpdateMetadata,
}

/// One queued conversion. Optional fields are populated as stages
/// complete; the payload round-trips through the queue as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertItem {
    pub asset_id: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    pub filename: String,
    pub original_type: String,
    pub destination_type: String,
    /// Computed destination filename, set in the first stage.
    #[serde(default)]
    pub destination_name: Option<String>,
    #[serde(default)]
    pub stage: ConvertStage,
    /// Conversion-job handle returned by the download-queue API.
    #[serde(default)]
    pub download_key: Option<String>,
    /// Poll attempts made so far in `check_upload`.
    #[serde(default)]
    pub checks: u32,
    /// Id of the newly created asset, set after upload.
    #[serde(default)]
    pub target_id: Option<String>,
    /// Epoch seconds of the last processing tick (re-entrancy guard).
    #[serde(default)]
    pub last_run: Option<i64>,
}

impl ConvertItem {
    /// A fresh item as seeded by the catalog sweep; stage defaults to
    /// `queue_download`.
    pub fn new(
        asset_id: impl Into<String>,
        folder_id: Option<String>,
        filename: impl Into<String>,
        original_type: impl Into<String>,
        destination_type: impl Into<String>,
    ) -> Self {
        Self {
            asset_id: asset_id.into(),
            folder_id,
            filename: filename.into(),
            original_type: original_type.into(),
            destination_type: destination_type.into(),
            destination_name: None,
            stage: ConvertStage::default(),
            download_key: None,
            checks: 0,
            target_id: None,
            last_run: None,
        }
    }

    /// Check the fields every stage depends on. Run on every dequeue;
    /// an item failing this is malformed and must be dropped.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (field, value) in [
            ("asset_id", &self.asset_id),
            ("filename", &self.filename),
            ("original_type", &self.original_type),
            ("destination_type", &self.destination_type),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::Validation(format!(
                    "convert item is missing required field '{field}'"
                )));
            }
        }
        Ok(())
    }

    /// The conversion pair, e.g. `tiff_to_png`.
    pub fn conversion_pair(&self) -> String {
        format!("{}_to_{}", self.original_type, self.destination_type)
    }

    /// Per-asset data key under which the completion record is stored.
    pub fn completion_key(&self) -> String {
        format!("convert_{}", self.conversion_pair())
    }

    /// Filename of the converted asset: the source basename with the
    /// destination extension.
    pub fn destination_filename(&self) -> String {
        let base = self
            .filename
            .rsplit('/')
            .next()
            .unwrap_or(self.filename.as_str());
        let stem = match base.rfind('.') {
            Some(dot) if dot > 0 => &base[..dot],
            _ => base,
        };
        format!("{stem}.{}", self.destination_type)
    }
}
