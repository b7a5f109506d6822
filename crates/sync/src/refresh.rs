//! Notification-driven refresh scheduling.
//!
//! Each cycle reads one page of the DAM's notifications feed for the
//! cursor's time window, maps affected asset ids to local records, and
//! enqueues one refresh item per record. The cursor persists between
//! cycles so no window is scanned twice and none is skipped.

use std::sync::Arc;

use chrono::Utc;

use damlink_core::cursor::RefreshCursor;
use damlink_core::error::CoreError;
use damlink_core::notification::changed_asset_ids;
use damlink_core::store::{RecordStore, StateStore, WorkQueue};
use damlink_dam::{DamApi, DamError};

/// State-store key under which the refresh cursor is persisted.
pub const REFRESH_CURSOR_KEY: &str = "dam_refresh_cursor";

/// Tunables for the notification fetch.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Notifications requested per page.
    pub request_limit: i64,
    /// How far back the very first window reaches, in seconds.
    pub read_interval_secs: i64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            request_limit: 100,
            read_interval_secs: 3600,
        }
    }
}

/// Runs one notification-polling cycle and fills the refresh queue.
pub struct RefreshManager {
    dam: Arc<dyn DamApi>,
    state: Arc<dyn StateStore>,
    records: Arc<dyn RecordStore>,
    queue: Arc<dyn WorkQueue>,
    config: RefreshConfig,
}

#[derive(Debug, thiserror::Error)]
enum CycleError {
    #[error(transparent)]
    Dam(#[from] DamError),
    #[error(transparent)]
    Store(#[from] CoreError),
}

impl RefreshManager {
    pub fn new(
        dam: Arc<dyn DamApi>,
        state: Arc<dyn StateStore>,
        records: Arc<dyn RecordStore>,
        queue: Arc<dyn WorkQueue>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            dam,
            state,
            records,
            queue,
            config,
        }
    }

    /// Fetch one page of notifications and enqueue a refresh item for
    /// every local record referencing a changed asset. Returns the
    /// number of items enqueued.
    ///
    /// Never fails the caller: any error leaves the persisted cursor
    /// untouched so the same window is retried on the next cycle.
    pub async fn update_queue(&self, bundles: &[String]) -> u64 {
        match self.run_cycle(bundles).await {
            Ok(enqueued) => enqueued,
            Err(err) => {
                tracing::error!(error = %err, "Refresh cycle failed; cursor left unchanged");
                0
            }
        }
    }

    async fn run_cycle(&self, bundles: &[String]) -> Result<u64, CycleError> {
        let now = Utc::now();
        let mut cursor = self.load_cursor(now).await?;
        let window_end = cursor.window_end(now);

        // With no bundles configured there is nothing to map changes
        // onto; advance the window without hitting the API.
        if bundles.is_empty() {
            cursor.complete(window_end);
            self.save_cursor(&cursor).await?;
            return Ok(0);
        }

        let page = self
            .dam
            .get_notifications(
                cursor.request_limit,
                cursor.offset(),
                cursor.start_time,
                window_end,
            )
            .await?;

        let asset_ids = changed_asset_ids(&page.notifications);
        let mut enqueued = 0u64;

        if !asset_ids.is_empty() {
            let record_ids = self.records.ids_referencing(bundles, &asset_ids).await?;
            for record_id in record_ids {
                self.queue
                    .push(serde_json::json!({ "record_id": record_id }))
                    .await?;
                enqueued += 1;
            }
        }

        // Persist the cursor only after every item landed in the
        // durable queue; a crash before this line re-reads the page and
        // re-enqueues, which the refresh worker absorbs idempotently.
        if cursor.must_continue(page.total) {
            cursor.interrupt(window_end);
        } else {
            cursor.complete(window_end);
        }
        self.save_cursor(&cursor).await?;

        tracing::info!(
            enqueued,
            notifications = page.notifications.len(),
            total = page.total,
            paging = cursor.next_page.is_some(),
            "Refresh cycle complete",
        );

        Ok(enqueued)
    }

    async fn load_cursor(&self, now: damlink_core::types::Timestamp) -> Result<RefreshCursor, CoreError> {
        match self.state.get(REFRESH_CURSOR_KEY).await? {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                CoreError::Storage(format!("stored refresh cursor is malformed: {e}"))
            }),
            None => Ok(RefreshCursor::new(
                now,
                self.config.read_interval_secs,
                self.config.request_limit,
            )),
        }
    }

    async fn save_cursor(&self, cursor: &RefreshCursor) -> Result<(), CoreError> {
        let value = serde_json::to_value(cursor)
            .map_err(|e| CoreError::Internal(format!("cursor serialization failed: {e}")))?;
        self.state.set(REFRESH_CURSOR_KEY, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testsupport::{MemoryQueue, MemoryRecords, MemoryState, MockDam};
    use damlink_dam::types::NotificationsPage;

    fn notification(action: &str, kind: &str, id: &str) -> serde_json::Value {
        serde_json::json!({
            "action": action,
            "source": { "type": kind, "id": id },
        })
    }

    fn page(total: i64, notifications: Vec<serde_json::Value>) -> NotificationsPage {
        serde_json::from_value(serde_json::json!({
            "offset": 0,
            "limit": 100,
            "total": total,
            "notifications": notifications,
        }))
        .unwrap()
    }

    fn manager(
        dam: Arc<MockDam>,
        state: Arc<MemoryState>,
        records: Arc<MemoryRecords>,
        queue: Arc<MemoryQueue>,
    ) -> RefreshManager {
        RefreshManager::new(
            dam,
            state,
            records,
            queue,
            RefreshConfig {
                request_limit: 100,
                read_interval_secs: 3600,
            },
        )
    }

    #[tokio::test]
    async fn enqueues_one_item_per_matching_record() {
        let dam = Arc::new(MockDam::default());
        dam.push_notifications_page(page(
            2,
            vec![
                notification("asset_version", "asset", "A1"),
                notification("asset_property", "image", "A2"),
            ],
        ));
        let records = Arc::new(MemoryRecords::default());
        records.add("media", "A1", 11);
        records.add("media", "A1", 12);
        records.add("media", "A2", 13);
        let state = Arc::new(MemoryState::default());
        let queue = Arc::new(MemoryQueue::default());

        let mgr = manager(dam, state, records, queue.clone());
        let enqueued = mgr.update_queue(&["media".to_string()]).await;

        assert_eq!(enqueued, 3);
        assert_eq!(queue.count().await.unwrap(), 3);
        assert_eq!(
            queue.snapshot()[0],
            serde_json::json!({ "record_id": 11 })
        );
    }

    #[tokio::test]
    async fn quiet_second_cycle_enqueues_nothing() {
        let dam = Arc::new(MockDam::default());
        dam.push_notifications_page(page(1, vec![notification("asset_version", "asset", "A1")]));
        dam.push_notifications_page(page(0, Vec::new()));
        let records = Arc::new(MemoryRecords::default());
        records.add("media", "A1", 11);
        let state = Arc::new(MemoryState::default());
        let queue = Arc::new(MemoryQueue::default());

        let mgr = manager(dam.clone(), state.clone(), records, queue.clone());
        let bundles = ["media".to_string()];
        let first = mgr.update_queue(&bundles).await;
        let second = mgr.update_queue(&bundles).await;

        assert_eq!(first, 1);
        assert_eq!(second, 0);
        assert_eq!(queue.count().await.unwrap(), 1);

        // The second window starts where the first one ended.
        let requests = dam.notification_requests();
        assert_eq!(requests[1].starttime, requests[0].endtime);
        assert_eq!(requests[1].offset, 0);
    }

    #[tokio::test]
    async fn completed_fetch_advances_the_cursor() {
        let dam = Arc::new(MockDam::default());
        dam.push_notifications_page(page(1, vec![notification("asset_version", "asset", "A1")]));
        let state = Arc::new(MemoryState::default());
        let records = Arc::new(MemoryRecords::default());
        let queue = Arc::new(MemoryQueue::default());

        let mgr = manager(dam.clone(), state.clone(), records, queue);
        mgr.update_queue(&["media".to_string()]).await;

        let cursor: RefreshCursor =
            serde_json::from_value(state.get_sync(REFRESH_CURSOR_KEY).unwrap()).unwrap();
        assert_eq!(cursor.end_time, None);
        assert_eq!(cursor.next_page, None);
        // start_time advanced to the window end just queried.
        let request = dam.notification_requests()[0].clone();
        assert_eq!(cursor.start_time, request.endtime);
    }

    #[tokio::test]
    async fn oversized_window_continues_onto_the_next_page() {
        let dam = Arc::new(MockDam::default());
        dam.push_notifications_page(page(250, vec![notification("asset_version", "asset", "A1")]));
        dam.push_notifications_page(page(250, vec![notification("asset_version", "asset", "A2")]));
        let state = Arc::new(MemoryState::default());
        let records = Arc::new(MemoryRecords::default());
        let queue = Arc::new(MemoryQueue::default());

        let mgr = manager(dam.clone(), state.clone(), records, queue);
        mgr.update_queue(&["media".to_string()]).await;

        let cursor: RefreshCursor =
            serde_json::from_value(state.get_sync(REFRESH_CURSOR_KEY).unwrap()).unwrap();
        assert_eq!(cursor.next_page, Some(2));
        assert!(cursor.end_time.is_some());

        // The second cycle queries page 2 of the same pinned window.
        mgr.update_queue(&["media".to_string()]).await;
        let requests = dam.notification_requests();
        assert_eq!(requests[1].offset, 100);
        assert_eq!(requests[1].endtime, requests[0].endtime);
        assert_eq!(requests[1].starttime, requests[0].starttime);
    }

    #[tokio::test]
    async fn empty_bundles_skip_the_api_and_advance_the_cursor() {
        let dam = Arc::new(MockDam::default());
        let state = Arc::new(MemoryState::default());
        let records = Arc::new(MemoryRecords::default());
        let queue = Arc::new(MemoryQueue::default());

        let mgr = manager(dam.clone(), state.clone(), records, queue);
        let enqueued = mgr.update_queue(&[]).await;

        assert_eq!(enqueued, 0);
        assert!(dam.notification_requests().is_empty());
        assert!(state.get_sync(REFRESH_CURSOR_KEY).is_some());
    }

    #[tokio::test]
    async fn untracked_actions_enqueue_nothing() {
        let dam = Arc::new(MockDam::default());
        dam.push_notifications_page(page(
            2,
            vec![
                notification("asset_version_bar", "asset", "A1"),
                notification("user_login", "user", "U1"),
            ],
        ));
        let records = Arc::new(MemoryRecords::default());
        records.add("media", "A1", 11);
        let queue = Arc::new(MemoryQueue::default());

        let mgr = manager(dam, Arc::new(MemoryState::default()), records, queue.clone());
        let enqueued = mgr.update_queue(&["media".to_string()]).await;

        assert_eq!(enqueued, 0);
        assert_eq!(queue.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn api_failure_leaves_the_cursor_untouched() {
        let dam = Arc::new(MockDam::default());
        // No pages scripted: the mock returns an API error.
        let state = Arc::new(MemoryState::default());
        let queue = Arc::new(MemoryQueue::default());

        let mgr = manager(
            dam,
            state.clone(),
            Arc::new(MemoryRecords::default()),
            queue.clone(),
        );
        let enqueued = mgr.update_queue(&["media".to_string()]).await;

        assert_eq!(enqueued, 0);
        assert!(state.get_sync(REFRESH_CURSOR_KEY).is_none());
        assert_eq!(queue.count().await.unwrap(), 0);
    }
}
