//! REST client for the DAM HTTP API.
//!
//! Wraps asset fetch/search, the three-step presigned upload flow, the
//! download-queue conversion API, metadata read/write, and the
//! notifications feed using [`reqwest`]. Every call attaches standard
//! headers and a bearer token from the [`TokenManager`].

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use reqwest::StatusCode;

use damlink_core::types::Timestamp;

use crate::api::DamApi;
use crate::auth::TokenManager;
use crate::error::DamError;
use crate::types::{
    ConfirmResponse, DamAsset, DownloadQueueStatus, NotificationsPage, PresignResponse,
    QueueDownloadResponse, SearchParams, SearchResults,
};

/// Versioned user agent sent on every request.
pub const USER_AGENT: &str = concat!("damlink/", env!("CARGO_PKG_VERSION"));

/// Sub-resources always expanded on asset fetches; downstream field
/// mapping and metadata copy depend on their presence.
pub const FORCED_EXPANDS: &[&str] = &["file_properties", "metadata", "embeds", "security"];

/// HTTP client for one DAM tenant.
pub struct DamClient {
    client: reqwest::Client,
    base_url: String,
    auth: TokenManager,
}

impl DamClient {
    /// Create a client for the DAM at `base_url` (no trailing slash).
    pub fn new(base_url: String, auth: TokenManager) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, auth)
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling with the token manager).
    pub fn with_client(client: reqwest::Client, base_url: String, auth: TokenManager) -> Self {
        Self {
            client,
            base_url,
            auth,
        }
    }

    // ---- private helpers ----

    /// Start an authenticated request: bearer token plus the standard
    /// `Accept` and `User-Agent` headers.
    async fn authed(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, DamError> {
        let token = self.auth.bearer_token().await?;
        Ok(builder
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::USER_AGENT, USER_AGENT))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Ensure the response has a success status code. 401 surfaces as
    /// [`DamError::InvalidCredentials`]; other failures carry the
    /// status and body text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, DamError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(DamError::InvalidCredentials(format!(
                "DAM rejected the bearer token: {body}"
            )));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(DamError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, DamError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// The caller's expands merged with [`FORCED_EXPANDS`], deduplicated.
fn merged_expands<'a>(requested: &[&'a str]) -> Vec<&'a str> {
    let mut expands: Vec<&str> = FORCED_EXPANDS.to_vec();
    for expand in requested {
        if !expands.contains(expand) {
            expands.push(expand);
        }
    }
    expands
}

/// Extract the presigned URL and process id from a presign response.
fn presign_target(response: &PresignResponse) -> Result<(&str, &str), DamError> {
    let url = response
        .presigned_url
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| DamError::Upload("presign step returned no presigned URL".into()))?;
    let process_id = response
        .process_id
        .as_deref()
        .ok_or_else(|| DamError::Upload("presign step returned no process id".into()))?;
    Ok((url, process_id))
}

/// The presigned PUT is accepted only with status 100 or 200.
fn check_presigned_put_status(status: u16) -> Result<(), DamError> {
    if status == 100 || status == 200 {
        Ok(())
    } else {
        Err(DamError::Upload(format!(
            "presigned PUT returned status {status}"
        )))
    }
}

#[async_trait]
impl DamApi for DamClient {
    async fn get_asset(&self, id: &str, expand: &[&str]) -> Result<DamAsset, DamError> {
        let expands = merged_expands(expand).join(",");
        let request = self
            .authed(self.client.get(self.url(&format!("/assets/{id}"))))
            .await?
            .query(&[("expand", expands.as_str())]);
        Self::parse_response(request.send().await?).await
    }

    async fn search_assets(&self, params: &SearchParams) -> Result<SearchResults, DamError> {
        let request = self
            .authed(self.client.get(self.url("/assets/search")))
            .await?
            .query(params);
        Self::parse_response(request.send().await?).await
    }

    async fn upload_asset(
        &self,
        file: &Path,
        filename: &str,
        folder_id: Option<&str>,
    ) -> Result<String, DamError> {
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|e| DamError::Upload(format!("cannot read {}: {e}", file.display())))?;
        let filetype = filename.rsplit('.').next().unwrap_or_default();

        // Step 1: request a presigned upload URL and process id.
        let presign: PresignResponse = {
            let body = serde_json::json!({
                "filename": filename,
                "filesize": bytes.len(),
                "filetype": filetype,
                "folder_id": folder_id,
            });
            let request = self
                .authed(self.client.post(self.url("/assets/uploads")))
                .await?
                .json(&body);
            Self::parse_response(request.send().await?).await?
        };
        let (presigned_url, process_id) = presign_target(&presign)?;

        // Step 2: PUT the raw bytes to the presigned URL. No request
        // timeout: renditions can be large. The URL is pre-authorized,
        // so no bearer header here.
        let put_response = self.client.put(presigned_url).body(bytes).send().await?;
        check_presigned_put_status(put_response.status().as_u16())?;

        // Step 3: confirm the upload to obtain the final asset id.
        let request = self
            .authed(
                self.client
                    .post(self.url(&format!("/assets/uploads/{process_id}/confirm"))),
            )
            .await?;
        let confirmed: ConfirmResponse = Self::parse_response(request.send().await?).await?;
        Ok(confirmed.id)
    }

    async fn queue_asset_download(
        &self,
        asset_ids: &[String],
        options: &serde_json::Value,
    ) -> Result<String, DamError> {
        let body = serde_json::json!({
            "asset_ids": asset_ids,
            "options": options,
        });
        let request = self
            .authed(self.client.post(self.url("/assets/queuedownload")))
            .await?
            .json(&body);
        let response: QueueDownloadResponse = Self::parse_response(request.send().await?).await?;
        response
            .download_key
            .ok_or_else(|| DamError::Decode("download-queue response had no download key".into()))
    }

    async fn download_from_queue(&self, key: &str) -> Result<DownloadQueueStatus, DamError> {
        let request = self
            .authed(
                self.client
                    .get(self.url(&format!("/assets/queuedownload/{key}"))),
            )
            .await?;
        Self::parse_response(request.send().await?).await
    }

    async fn edit_asset(&self, id: &str, fields: &serde_json::Value) -> Result<bool, DamError> {
        let request = self
            .authed(self.client.put(self.url(&format!("/assets/{id}"))))
            .await?
            .json(fields);
        let response = request.send().await?;
        // 409 means the asset has unmet required metadata: a business
        // rule, not a transport failure.
        if response.status() == StatusCode::CONFLICT {
            return Ok(false);
        }
        Self::ensure_success(response).await?;
        Ok(true)
    }

    async fn edit_asset_xmp(
        &self,
        id: &str,
        data: &HashMap<String, serde_json::Value>,
    ) -> Result<(), DamError> {
        let request = self
            .authed(self.client.put(self.url(&format!("/assets/{id}/xmp"))))
            .await?
            .json(data);
        Self::ensure_success(request.send().await?).await?;
        Ok(())
    }

    async fn get_asset_metadata(
        &self,
        id: &str,
    ) -> Result<HashMap<String, serde_json::Value>, DamError> {
        let request = self
            .authed(self.client.get(self.url(&format!("/assets/{id}/metadata"))))
            .await?;
        Self::parse_response(request.send().await?).await
    }

    async fn get_notifications(
        &self,
        limit: i64,
        offset: i64,
        starttime: Timestamp,
        endtime: Timestamp,
    ) -> Result<NotificationsPage, DamError> {
        let request = self
            .authed(self.client.get(self.url("/notifications")))
            .await?
            .query(&[
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
                ("starttime", starttime.timestamp().to_string()),
                ("endtime", endtime.timestamp().to_string()),
            ]);
        Self::parse_response(request.send().await?).await
    }
}
