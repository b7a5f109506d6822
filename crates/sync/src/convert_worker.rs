//! Conversion queue worker.
//!
//! Drives one [`ConvertItem`] forward by exactly one stage per
//! dequeue. Conversion is best-effort bulk work: almost every failure
//! drops the item with a logged reason rather than suspending the
//! queue, since one bad asset must not stall the rest of the batch.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use damlink_core::convert::{ConvertItem, ConvertStage, MAX_POLL_ATTEMPTS};
use damlink_core::outcome::ProcessOutcome;
use damlink_core::store::AssetDataStore;
use damlink_core::transfer::FileTransfer;
use damlink_dam::types::{DownloadItemStatus, SearchParams};
use damlink_dam::DamApi;

use crate::runner::QueueWorker;

type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

/// Processes conversion queue items stage by stage.
pub struct ConvertWorker {
    dam: Arc<dyn DamApi>,
    asset_data: Arc<dyn AssetDataStore>,
    transfer: Arc<dyn FileTransfer>,
    clock: Clock,
}

impl ConvertWorker {
    pub fn new(
        dam: Arc<dyn DamApi>,
        asset_data: Arc<dyn AssetDataStore>,
        transfer: Arc<dyn FileTransfer>,
    ) -> Self {
        Self::with_clock(dam, asset_data, transfer, Box::new(|| Utc::now().timestamp()))
    }

    /// Constructor with an injectable epoch-seconds clock, used by the
    /// re-entrancy guard.
    pub fn with_clock(
        dam: Arc<dyn DamApi>,
        asset_data: Arc<dyn AssetDataStore>,
        transfer: Arc<dyn FileTransfer>,
        clock: Clock,
    ) -> Self {
        Self {
            dam,
            asset_data,
            transfer,
            clock,
        }
    }

    fn requeue(item: &ConvertItem) -> ProcessOutcome {
        match serde_json::to_value(item) {
            Ok(payload) => ProcessOutcome::Requeue(payload),
            Err(err) => ProcessOutcome::Drop(format!("convert item serialization failed: {err}")),
        }
    }

    /// Stage 1: ask the DAM to produce the converted rendition, unless
    /// the destination file already exists in the catalog.
    async fn queue_download(&self, mut item: ConvertItem) -> ProcessOutcome {
        let destination = item.destination_filename();

        let params = SearchParams {
            limit: 1,
            query: Some(destination.clone()),
            folder_id: item.folder_id.clone(),
            ..SearchParams::default()
        };
        let existing = match self.dam.search_assets(&params).await {
            Ok(results) => results,
            Err(err) => {
                return ProcessOutcome::Drop(format!(
                    "destination lookup for '{destination}' failed: {err}"
                ))
            }
        };
        if existing
            .assets
            .iter()
            .any(|asset| asset.filename.eq_ignore_ascii_case(&destination))
        {
            return ProcessOutcome::Drop(format!(
                "destination '{destination}' already exists; skipping conversion"
            ));
        }

        let options = serde_json::json!({ "format": item.destination_type });
        let key = match self
            .dam
            .queue_asset_download(std::slice::from_ref(&item.asset_id), &options)
            .await
        {
            Ok(key) => key,
            Err(err) => {
                return ProcessOutcome::Drop(format!("conversion job submission failed: {err}"))
            }
        };

        tracing::info!(
            asset_id = %item.asset_id,
            conversion = %item.conversion_pair(),
            "Conversion job queued",
        );

        item.download_key = Some(key);
        item.destination_name = Some(destination);
        item.checks = 0;
        item.stage = ConvertStage::CheckUpload;
        Self::requeue(&item)
    }

    /// Stage 2: poll the conversion job; on success pull the rendition
    /// and upload it as a new asset.
    async fn check_upload(&self, mut item: ConvertItem) -> ProcessOutcome {
        let Some(key) = item.download_key.clone() else {
            return ProcessOutcome::Drop("check_upload item has no download key".into());
        };

        item.checks += 1;
        if item.checks >= MAX_POLL_ATTEMPTS {
            return ProcessOutcome::Drop(format!(
                "conversion job not ready after {} checks",
                MAX_POLL_ATTEMPTS
            ));
        }

        let status = match self.dam.download_from_queue(&key).await {
            Ok(status) => status,
            Err(err) => {
                tracing::warn!(
                    asset_id = %item.asset_id,
                    error = %err,
                    "Conversion poll failed; will retry",
                );
                return Self::requeue(&item);
            }
        };
        if !status.is_done() {
            return Self::requeue(&item);
        }

        let Some(result) = status.result_for(&item.asset_id) else {
            return ProcessOutcome::Drop("conversion job finished without this asset".into());
        };
        match result.status {
            DownloadItemStatus::Ready => match result.presigned_url.clone() {
                Some(url) => self.upload(item, &url).await,
                None => ProcessOutcome::Drop("conversion result has no download URL".into()),
            },
            DownloadItemStatus::Failed => ProcessOutcome::Drop(format!(
                "conversion failed remotely: {}",
                result.error.as_deref().unwrap_or("no reason given")
            )),
            DownloadItemStatus::Processing | DownloadItemStatus::Unknown => Self::requeue(&item),
        }
    }

    async fn upload(&self, mut item: ConvertItem, url: &str) -> ProcessOutcome {
        let temp = match tempfile::NamedTempFile::new() {
            Ok(temp) => temp,
            Err(err) => return ProcessOutcome::Drop(format!("temp file creation failed: {err}")),
        };
        if let Err(err) = self.transfer.fetch_to_file(url, temp.path()).await {
            return ProcessOutcome::Drop(format!("rendition download failed: {err}"));
        }

        let filename = item
            .destination_name
            .clone()
            .unwrap_or_else(|| item.destination_filename());
        let target_id = match self
            .dam
            .upload_asset(temp.path(), &filename, item.folder_id.as_deref())
            .await
        {
            Ok(id) => id,
            Err(err) => return ProcessOutcome::Drop(format!("rendition upload failed: {err}")),
        };
        if target_id.is_empty() || target_id == "0" {
            return ProcessOutcome::Drop("upload confirmed without a usable asset id".into());
        }

        tracing::info!(
            asset_id = %item.asset_id,
            target_id = %target_id,
            filename = %filename,
            "Converted rendition uploaded",
        );

        item.target_id = Some(target_id);
        item.stage = ConvertStage::UpdateMetadata;
        Self::requeue(&item)
    }

    /// Stage 3: copy description, status, and XMP metadata onto the
    /// new asset, then write the completion record.
    async fn update_metadata(&self, item: ConvertItem) -> ProcessOutcome {
        let Some(target_id) = item.target_id.clone() else {
            return ProcessOutcome::Drop("update_metadata item has no target asset".into());
        };

        let source = match self.dam.get_asset(&item.asset_id, &["xmp_metadata"]).await {
            Ok(asset) => asset,
            Err(err) => return ProcessOutcome::Drop(format!("source asset fetch failed: {err}")),
        };

        // Metadata copy is best-effort: the converted asset exists and
        // must be marked complete even if the DAM rejects the edits.
        let mut fields = serde_json::Map::new();
        if let Some(description) = &source.description {
            fields.insert("description".into(), serde_json::json!(description));
        }
        if let Some(status) = &source.status {
            fields.insert("status".into(), serde_json::json!(status));
        }
        if !fields.is_empty() {
            match self
                .dam
                .edit_asset(&target_id, &serde_json::Value::Object(fields))
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(
                        target_id = %target_id,
                        "DAM rejected field copy (required metadata unmet)",
                    );
                }
                Err(err) => {
                    tracing::warn!(target_id = %target_id, error = %err, "Field copy failed");
                }
            }
        }

        if let Some(xmp) = &source.xmp_metadata {
            let flat = damlink_dam::types::flatten_xmp(xmp);
            if !flat.is_empty() {
                if let Err(err) = self.dam.edit_asset_xmp(&target_id, &flat).await {
                    tracing::warn!(target_id = %target_id, error = %err, "XMP copy failed");
                }
            }
        }

        if let Err(err) = self
            .asset_data
            .set(&item.asset_id, &item.completion_key(), serde_json::json!(true))
            .await
        {
            // Without the completion record the item would be reseeded
            // and converted again; stop here rather than duplicate.
            return ProcessOutcome::Suspend(format!("completion record write failed: {err}"));
        }

        tracing::info!(
            asset_id = %item.asset_id,
            target_id = %target_id,
            conversion = %item.conversion_pair(),
            "Conversion complete",
        );
        ProcessOutcome::Done
    }
}

#[async_trait]
impl QueueWorker for ConvertWorker {
    fn name(&self) -> &'static str {
        "dam_convert"
    }

    async fn process(&self, payload: serde_json::Value) -> ProcessOutcome {
        let mut item: ConvertItem = match serde_json::from_value(payload) {
            Ok(item) => item,
            Err(err) => return ProcessOutcome::Drop(format!("malformed convert payload: {err}")),
        };
        if let Err(err) = item.validate() {
            return ProcessOutcome::Drop(err.to_string());
        }

        match self.asset_data.get(&item.asset_id, &item.completion_key()).await {
            Ok(Some(_)) => {
                tracing::info!(
                    asset_id = %item.asset_id,
                    conversion = %item.conversion_pair(),
                    "Conversion already recorded complete",
                );
                return ProcessOutcome::Done;
            }
            Ok(None) => {}
            Err(err) => {
                return ProcessOutcome::Suspend(format!("completion record lookup failed: {err}"))
            }
        }

        // Re-entrancy guard: a second dequeue of the same item within
        // the same second is deferred untouched.
        let now = (self.clock)();
        if item.last_run == Some(now) {
            return Self::requeue(&item);
        }
        item.last_run = Some(now);

        match item.stage {
            ConvertStage::QueueDownload => self.queue_download(item).await,
            ConvertStage::CheckUpload => self.check_upload(item).await,
            ConvertStage::UpdateMetadata => self.update_metadata(item).await,
        }
    }
}
