//! damlink synchronization engine.
//!
//! Cron-driven building blocks keeping local records in step with the
//! remote DAM:
//!
//! - [`refresh::RefreshManager`] — one fetch-and-enqueue cycle over
//!   the notifications delta feed.
//! - [`refresh_worker::RefreshWorker`] — re-syncs one local record
//!   from its remote asset.
//! - [`convert_worker::ConvertWorker`] — drives the multi-stage
//!   format-conversion workflow per asset.
//! - [`seeder::ConvertSeeder`] — sweeps the remote catalog and seeds
//!   the conversion queue.
//! - [`runner::QueueRunner`] — drains a queue, applying each item's
//!   [`ProcessOutcome`](damlink_core::ProcessOutcome).

pub mod convert_worker;
pub mod refresh;
pub mod refresh_worker;
pub mod runner;
pub mod seeder;

#[cfg(test)]
mod testsupport;

pub use convert_worker::ConvertWorker;
pub use refresh::{RefreshConfig, RefreshManager};
pub use refresh_worker::RefreshWorker;
pub use runner::{DrainSummary, QueueRunner, QueueWorker};
pub use seeder::ConvertSeeder;
