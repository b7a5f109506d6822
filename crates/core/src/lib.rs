//! damlink domain core.
//!
//! Pure domain types and logic for the DAM synchronization engine:
//!
//! - [`notification`] — change-notification payloads and the extraction
//!   of affected asset ids from a delta-feed batch.
//! - [`cursor`] — the persisted refresh cursor driving incremental
//!   notification polling.
//! - [`convert`] — the multi-stage format-conversion queue item.
//! - [`outcome`] — the per-item processing outcome consumed by the
//!   queue runner.
//! - [`store`] / [`transfer`] — collaborator port traits (key-value
//!   state, per-asset data, local records, durable queue, file
//!   transfer) implemented by `damlink-db` and `damlink-dam`.
//!
//! This crate performs no I/O of its own.

pub mod convert;
pub mod cursor;
pub mod error;
pub mod notification;
pub mod outcome;
pub mod record;
pub mod store;
pub mod transfer;
pub mod types;

pub use convert::{ConvertItem, ConvertStage, MAX_POLL_ATTEMPTS};
pub use cursor::RefreshCursor;
pub use error::CoreError;
pub use outcome::ProcessOutcome;
pub use record::LocalRecord;
