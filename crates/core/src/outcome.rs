//! Per-item processing outcome.
//!
//! Workers return an explicit outcome instead of signalling through
//! exceptions; the queue runner performs the corresponding queue
//! action. Every non-`Done` outcome carries enough context for a log
//! line, so no item is ever dropped silently.

use std::time::Duration;

/// What the queue runner should do with a processed item.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// Processing finished; delete the item.
    Done,
    /// Retry on the next drain pass with the given (possibly mutated)
    /// payload.
    Requeue(serde_json::Value),
    /// Retry after a delay; used for remote timeouts.
    DelayedRequeue(serde_json::Value, Duration),
    /// Stop draining this queue entirely; the item is released for a
    /// later run. Used when retrying other items is pointless (service
    /// down, credentials invalid).
    Suspend(String),
    /// Permanent failure; delete the item and log the reason.
    Drop(String),
}
