//! HTTP implementation of the file-transfer port.

use std::path::Path;

use async_trait::async_trait;

use damlink_core::error::CoreError;
use damlink_core::transfer::FileTransfer;

/// Fetches presigned-URL content over plain HTTP. Presigned URLs are
/// self-authorizing, so no bearer header is attached.
pub struct HttpTransfer {
    client: reqwest::Client,
}

impl HttpTransfer {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransfer {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl FileTransfer for HttpTransfer {
    async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<(), CoreError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CoreError::Transfer(format!("GET {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::Transfer(format!(
                "GET {url} returned status {status}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CoreError::Transfer(format!("reading body of {url} failed: {e}")))?;

        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|e| CoreError::Transfer(format!("writing {} failed: {e}", dest.display())))
    }
}
