//! Worker configuration loaded from environment variables.

use anyhow::Context;

/// Runtime configuration for the sync worker.
///
/// | Env Var                   | Default    | Notes                         |
/// |---------------------------|------------|-------------------------------|
/// | `DATABASE_URL`            | (required) | PostgreSQL connection string  |
/// | `DAM_BASE_URL`            | (required) | DAM REST API base URL         |
/// | `DAM_TOKEN_URL`           | (required) | OAuth2 token endpoint         |
/// | `DAM_CLIENT_ID`           | (required) |                               |
/// | `DAM_CLIENT_SECRET`       | (required) |                               |
/// | `DAM_USERNAME`            | (required) | Service-account login         |
/// | `DAM_PASSWORD`            | (required) |                               |
/// | `SYNC_BUNDLES`            | (empty)    | Comma-separated record bundles|
/// | `REFRESH_LIMIT`           | `100`      | Notifications per page        |
/// | `REFRESH_INTERVAL_SECS`   | `3600`     | First polling window reach    |
/// | `VISIBILITY_TIMEOUT_SECS` | `300`      | Queue claim visibility        |
/// | `DRAIN_BATCH`             | `50`       | Items per drain pass          |
/// | `POLL_INTERVAL_SECS`      | `60`       | Daemon tick interval          |
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub dam_base_url: String,
    pub dam_token_url: String,
    pub dam_client_id: String,
    pub dam_client_secret: String,
    pub dam_username: String,
    pub dam_password: String,
    pub sync_bundles: Vec<String>,
    pub refresh_limit: i64,
    pub refresh_interval_secs: i64,
    pub visibility_timeout_secs: u64,
    pub drain_batch: usize,
    pub poll_interval_secs: u64,
}

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("{name} must be set"))
}

fn parsed<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{name} is not a valid value")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let sync_bundles = std::env::var("SYNC_BUNDLES")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            dam_base_url: required("DAM_BASE_URL")?,
            dam_token_url: required("DAM_TOKEN_URL")?,
            dam_client_id: required("DAM_CLIENT_ID")?,
            dam_client_secret: required("DAM_CLIENT_SECRET")?,
            dam_username: required("DAM_USERNAME")?,
            dam_password: required("DAM_PASSWORD")?,
            sync_bundles,
            refresh_limit: parsed("REFRESH_LIMIT", 100)?,
            refresh_interval_secs: parsed("REFRESH_INTERVAL_SECS", 3600)?,
            visibility_timeout_secs: parsed("VISIBILITY_TIMEOUT_SECS", 300)?,
            drain_batch: parsed("DRAIN_BATCH", 50)?,
            poll_interval_secs: parsed("POLL_INTERVAL_SECS", 60)?,
        })
    }
}
