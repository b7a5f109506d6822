//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod credential_repo;
pub mod kv_repo;
pub mod queue_repo;
pub mod record_repo;

pub use credential_repo::CredentialRepo;
pub use kv_repo::{AssetDataRepo, StateRepo};
pub use queue_repo::QueueRepo;
pub use record_repo::LocalRecordRepo;
