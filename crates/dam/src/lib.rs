//! Client for the remote Digital Asset Management service.
//!
//! - [`client::DamClient`] — authenticated wrapper over the DAM REST
//!   API (asset fetch, search, presigned upload, download-queue
//!   conversion jobs, metadata, notifications).
//! - [`api::DamApi`] — the explicit operation trait the sync engine
//!   consumes; mockable in tests.
//! - [`auth::TokenManager`] — OAuth2 token acquisition, expiry
//!   tracking, and transparent refresh.

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod transfer;
pub mod types;

pub use api::DamApi;
pub use auth::{OAuthConfig, TokenManager, TokenStore};
pub use client::DamClient;
pub use error::DamError;
pub use transfer::HttpTransfer;
