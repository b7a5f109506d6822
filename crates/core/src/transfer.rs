//! File transfer port.

use std::path::Path;

use async_trait::async_trait;

use crate::error::CoreError;

/// Fetches remote content to local files. The only consumer is the
/// conversion upload helper, which pulls presigned-URL content into a
/// temp file before re-uploading it to the DAM.
#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Download `url` into `dest`, replacing any existing content.
    async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<(), CoreError>;
}
