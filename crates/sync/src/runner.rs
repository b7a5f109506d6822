//! Queue drain loop.
//!
//! Claims one item at a time, hands it to a worker, and performs the
//! queue action its [`ProcessOutcome`] asks for. The queue's claim
//! semantics are the only concurrency control; the runner holds no
//! locks of its own.

use std::sync::Arc;

use async_trait::async_trait;

use damlink_core::error::CoreError;
use damlink_core::outcome::ProcessOutcome;
use damlink_core::store::WorkQueue;

/// Per-item processing callback for one queue type.
#[async_trait]
pub trait QueueWorker: Send + Sync {
    /// Queue name, used for logging.
    fn name(&self) -> &'static str;

    /// Process one dequeued payload.
    async fn process(&self, payload: serde_json::Value) -> ProcessOutcome;
}

/// Result of one drain pass.
#[derive(Debug, Default)]
pub struct DrainSummary {
    /// Items that finished (deleted from the queue).
    pub processed: u64,
    /// Items re-enqueued, with or without delay.
    pub requeued: u64,
    /// Items dropped as permanent failures.
    pub dropped: u64,
    /// Set when the drain stopped early; the reason for suspension.
    pub suspended: Option<String>,
}

/// Drains a [`WorkQueue`] through a [`QueueWorker`].
pub struct QueueRunner {
    queue: Arc<dyn WorkQueue>,
}

impl QueueRunner {
    pub fn new(queue: Arc<dyn WorkQueue>) -> Self {
        Self { queue }
    }

    /// Process up to `max_items` items. Stops early when the queue is
    /// empty or the worker asks to suspend.
    ///
    /// A requeue pushes the new payload before deleting the old item,
    /// so a crash between the two duplicates delivery instead of
    /// losing it; workers are idempotent under redelivery.
    pub async fn drain(
        &self,
        worker: &dyn QueueWorker,
        max_items: usize,
    ) -> Result<DrainSummary, CoreError> {
        let mut summary = DrainSummary::default();

        for _ in 0..max_items {
            let Some(item) = self.queue.claim().await? else {
                break;
            };

            match worker.process(item.payload).await {
                ProcessOutcome::Done => {
                    self.queue.delete(item.id).await?;
                    summary.processed += 1;
                }
                ProcessOutcome::Requeue(payload) => {
                    self.queue.push(payload).await?;
                    self.queue.delete(item.id).await?;
                    summary.requeued += 1;
                }
                ProcessOutcome::DelayedRequeue(payload, delay) => {
                    self.queue.push_delayed(payload, delay).await?;
                    self.queue.delete(item.id).await?;
                    summary.requeued += 1;
                }
                ProcessOutcome::Suspend(reason) => {
                    tracing::warn!(
                        queue = worker.name(),
                        reason = %reason,
                        "Suspending queue processing",
                    );
                    self.queue.release(item.id).await?;
                    summary.suspended = Some(reason);
                    break;
                }
                ProcessOutcome::Drop(reason) => {
                    tracing::warn!(
                        queue = worker.name(),
                        reason = %reason,
                        "Dropping queue item",
                    );
                    self.queue.delete(item.id).await?;
                    summary.dropped += 1;
                }
            }
        }

        Ok(summary)
    }
}
