//! Refresh queue worker.
//!
//! Re-syncs one local record from its remote asset. The interesting
//! part is error classification: a failure either suspends the whole
//! drain (systemic), drops the item (permanent), or retries it
//! (transient), matching what another attempt could actually fix.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use damlink_core::outcome::ProcessOutcome;
use damlink_core::store::RecordStore;
use damlink_dam::{DamApi, DamError};

use crate::runner::QueueWorker;

/// Retry delay after a remote-side request timeout (HTTP 408).
const TIMEOUT_RETRY_DELAY: Duration = Duration::from_secs(300);

/// Payload of one refresh queue item.
#[derive(Debug, Deserialize)]
struct RefreshPayload {
    record_id: damlink_core::types::DbId,
}

/// Processes refresh queue items.
pub struct RefreshWorker {
    dam: Arc<dyn DamApi>,
    records: Arc<dyn RecordStore>,
}

impl RefreshWorker {
    pub fn new(dam: Arc<dyn DamApi>, records: Arc<dyn RecordStore>) -> Self {
        Self { dam, records }
    }

    fn classify(payload: serde_json::Value, err: &DamError) -> ProcessOutcome {
        if err.is_connect() || err.is_timeout() {
            return ProcessOutcome::Suspend(format!("DAM unreachable: {err}"));
        }
        match err {
            DamError::InvalidCredentials(_) => {
                ProcessOutcome::Suspend(format!("DAM authentication failed: {err}"))
            }
            DamError::Api { status, .. } => match status {
                401 => ProcessOutcome::Suspend(format!("DAM authentication failed: {err}")),
                404 => ProcessOutcome::Drop("remote asset no longer exists".into()),
                408 => ProcessOutcome::DelayedRequeue(payload, TIMEOUT_RETRY_DELAY),
                _ => ProcessOutcome::Requeue(payload),
            },
            _ => ProcessOutcome::Suspend(format!("DAM client failure: {err}")),
        }
    }
}

#[async_trait]
impl QueueWorker for RefreshWorker {
    fn name(&self) -> &'static str {
        "dam_refresh"
    }

    async fn process(&self, payload: serde_json::Value) -> ProcessOutcome {
        let parsed: RefreshPayload = match serde_json::from_value(payload.clone()) {
            Ok(parsed) => parsed,
            Err(err) => return ProcessOutcome::Drop(format!("malformed refresh payload: {err}")),
        };

        let record = match self.records.load(parsed.record_id).await {
            Ok(Some(record)) => record,
            // The record was deleted between enqueue and processing.
            Ok(None) => {
                tracing::debug!(record_id = parsed.record_id, "Record gone; nothing to refresh");
                return ProcessOutcome::Done;
            }
            Err(err) => return ProcessOutcome::Suspend(format!("record load failed: {err}")),
        };

        let asset = match self.dam.get_asset(&record.asset_id, &[]).await {
            Ok(asset) => asset,
            Err(err) => return Self::classify(payload, &err),
        };

        match self
            .records
            .apply_refresh(record.id, asset.file_upload_date.as_deref())
            .await
        {
            Ok(()) => {
                tracing::info!(
                    record_id = record.id,
                    asset_id = %record.asset_id,
                    "Record refreshed from remote asset",
                );
                ProcessOutcome::Done
            }
            Err(err) => ProcessOutcome::Suspend(format!("record update failed: {err}")),
        }
    }
}
