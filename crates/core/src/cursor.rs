//! Persisted bookmark for incremental notification polling.
//!
//! The cursor bounds each notification query to a stable time window
//! and remembers where a multi-page fetch was interrupted, so one slow
//! cron tick neither re-scans processed notifications nor skips ones
//! created while paging.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Cross-invocation state of the refresh manager.
///
/// `end_time` and `next_page` are set only while a paginated fetch is
/// in progress; a completed fetch clears both and advances
/// `start_time` to the window end just queried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshCursor {
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub next_page: Option<i64>,
    pub request_limit: i64,
    pub last_read_interval_secs: i64,
}

impl RefreshCursor {
    /// Initial cursor: the first window reaches back `interval_secs`
    /// from `now`.
    pub fn new(now: Timestamp, interval_secs: i64, request_limit: i64) -> Self {
        Self {
            start_time: now - Duration::seconds(interval_secs),
            end_time: None,
            next_page: None,
            request_limit,
            last_read_interval_secs: interval_secs,
        }
    }

    /// The page to request next (1-based).
    pub fn page(&self) -> i64 {
        self.next_page.unwrap_or(1)
    }

    /// Item offset for the current page.
    pub fn offset(&self) -> i64 {
        self.request_limit * (self.page() - 1)
    }

    /// The end of the window to query: pinned while paginating,
    /// otherwise `now`.
    pub fn window_end(&self, now: Timestamp) -> Timestamp {
        self.end_time.unwrap_or(now)
    }

    /// A fetch returned the final page of the window ending at
    /// `window_end`: advance the window and reset pagination.
    pub fn complete(&mut self, window_end: Timestamp) {
        self.start_time = window_end;
        self.end_time = None;
        self.next_page = None;
    }

    /// A fetch was interrupted mid-window: bump the page and pin
    /// `end_time` so later pages query the same window. Only the first
    /// interruption in a sequence sets the pin.
    pub fn interrupt(&mut self, window_end: Timestamp) {
        self.next_page = Some(self.page() + 1);
        if self.end_time.is_none() {
            self.end_time = Some(window_end);
        }
    }

    /// Whether a fetch with `total` matching items must continue onto
    /// another page.
    pub fn must_continue(&self, total: i64) -> bool {
        total > self.request_limit * self.page()
    }
}
