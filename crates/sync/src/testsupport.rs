//! In-memory doubles for the engine's collaborator ports.
//!
//! `MockDam` replays scripted responses in order and records every
//! call, so tests assert on both outcomes and the exact requests made.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use damlink_core::error::CoreError;
use damlink_core::record::LocalRecord;
use damlink_core::store::{AssetDataStore, ClaimedItem, RecordStore, StateStore, WorkQueue};
use damlink_core::transfer::FileTransfer;
use damlink_core::types::{DbId, Timestamp};
use damlink_dam::types::{
    DamAsset, DownloadQueueStatus, NotificationsPage, SearchParams, SearchResults,
};
use damlink_dam::{DamApi, DamError};

#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub limit: i64,
    pub offset: i64,
    pub starttime: Timestamp,
    pub endtime: Timestamp,
}

#[derive(Debug, Clone)]
pub struct UploadRecord {
    pub filename: String,
    pub folder_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EditRecord {
    pub asset_id: String,
    pub fields: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct XmpRecord {
    pub asset_id: String,
    pub data: HashMap<String, serde_json::Value>,
}

/// How `get_asset` should fail, when a failure is scripted.
enum AssetFailure {
    Status(u16),
    Credentials,
}

#[derive(Default)]
pub struct MockDam {
    assets: Mutex<HashMap<String, serde_json::Value>>,
    asset_failure: Mutex<Option<AssetFailure>>,
    asset_requests: Mutex<Vec<String>>,
    search_pages: Mutex<VecDeque<SearchResults>>,
    searches: Mutex<Vec<SearchParams>>,
    queue_download_keys: Mutex<VecDeque<String>>,
    queue_download_requests: Mutex<Vec<serde_json::Value>>,
    poll_statuses: Mutex<VecDeque<DownloadQueueStatus>>,
    upload_results: Mutex<VecDeque<String>>,
    uploads: Mutex<Vec<UploadRecord>>,
    edits: Mutex<Vec<EditRecord>>,
    reject_edits: Mutex<bool>,
    xmp_edits: Mutex<Vec<XmpRecord>>,
    notification_pages: Mutex<VecDeque<NotificationsPage>>,
    notification_requests: Mutex<Vec<NotificationRequest>>,
}

impl MockDam {
    fn exhausted(what: &str) -> DamError {
        DamError::Api {
            status: 500,
            body: format!("no scripted {what} response"),
        }
    }

    pub fn put_asset(&self, asset: serde_json::Value) {
        let id = asset["id"].as_str().unwrap().to_string();
        self.assets.lock().unwrap().insert(id, asset);
    }

    pub fn fail_asset_with_status(&self, status: u16) {
        *self.asset_failure.lock().unwrap() = Some(AssetFailure::Status(status));
    }

    pub fn fail_asset_with_credentials(&self) {
        *self.asset_failure.lock().unwrap() = Some(AssetFailure::Credentials);
    }

    pub fn asset_requests(&self) -> Vec<String> {
        self.asset_requests.lock().unwrap().clone()
    }

    pub fn push_search_results(&self, total_count: i64, assets: Vec<serde_json::Value>) {
        let results: SearchResults = serde_json::from_value(serde_json::json!({
            "total_count": total_count,
            "assets": assets,
        }))
        .unwrap();
        self.search_pages.lock().unwrap().push_back(results);
    }

    pub fn searches(&self) -> Vec<SearchParams> {
        self.searches.lock().unwrap().clone()
    }

    pub fn push_queue_download_key(&self, key: &str) {
        self.queue_download_keys
            .lock()
            .unwrap()
            .push_back(key.to_string());
    }

    pub fn queue_download_requests(&self) -> Vec<serde_json::Value> {
        self.queue_download_requests.lock().unwrap().clone()
    }

    pub fn push_poll_status(&self, status: serde_json::Value) {
        self.poll_statuses
            .lock()
            .unwrap()
            .push_back(serde_json::from_value(status).unwrap());
    }

    pub fn polls_remaining(&self) -> usize {
        self.poll_statuses.lock().unwrap().len()
    }

    pub fn push_upload_result(&self, id: &str) {
        self.upload_results.lock().unwrap().push_back(id.to_string());
    }

    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<EditRecord> {
        self.edits.lock().unwrap().clone()
    }

    pub fn reject_edits(&self) {
        *self.reject_edits.lock().unwrap() = true;
    }

    pub fn xmp_edits(&self) -> Vec<XmpRecord> {
        self.xmp_edits.lock().unwrap().clone()
    }

    pub fn push_notifications_page(&self, page: NotificationsPage) {
        self.notification_pages.lock().unwrap().push_back(page);
    }

    pub fn notification_requests(&self) -> Vec<NotificationRequest> {
        self.notification_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DamApi for MockDam {
    async fn get_asset(&self, id: &str, _expand: &[&str]) -> Result<DamAsset, DamError> {
        self.asset_requests.lock().unwrap().push(id.to_string());
        if let Some(failure) = self.asset_failure.lock().unwrap().as_ref() {
            return Err(match failure {
                AssetFailure::Status(status) => DamError::Api {
                    status: *status,
                    body: "scripted failure".into(),
                },
                AssetFailure::Credentials => {
                    DamError::InvalidCredentials("scripted failure".into())
                }
            });
        }
        let assets = self.assets.lock().unwrap();
        let raw = assets.get(id).ok_or(DamError::Api {
            status: 404,
            body: "not found".into(),
        })?;
        serde_json::from_value(raw.clone()).map_err(|e| DamError::Decode(e.to_string()))
    }

    async fn search_assets(&self, params: &SearchParams) -> Result<SearchResults, DamError> {
        self.searches.lock().unwrap().push(params.clone());
        self.search_pages
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Self::exhausted("search"))
    }

    async fn upload_asset(
        &self,
        _file: &Path,
        filename: &str,
        folder_id: Option<&str>,
    ) -> Result<String, DamError> {
        self.uploads.lock().unwrap().push(UploadRecord {
            filename: filename.to_string(),
            folder_id: folder_id.map(str::to_string),
        });
        self.upload_results
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| DamError::Upload("no scripted upload result".into()))
    }

    async fn queue_asset_download(
        &self,
        asset_ids: &[String],
        options: &serde_json::Value,
    ) -> Result<String, DamError> {
        self.queue_download_requests
            .lock()
            .unwrap()
            .push(serde_json::json!({ "asset_ids": asset_ids, "options": options }));
        self.queue_download_keys
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Self::exhausted("queue download"))
    }

    async fn download_from_queue(&self, _key: &str) -> Result<DownloadQueueStatus, DamError> {
        self.poll_statuses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Self::exhausted("download queue poll"))
    }

    async fn edit_asset(&self, id: &str, fields: &serde_json::Value) -> Result<bool, DamError> {
        self.edits.lock().unwrap().push(EditRecord {
            asset_id: id.to_string(),
            fields: fields.clone(),
        });
        Ok(!*self.reject_edits.lock().unwrap())
    }

    async fn edit_asset_xmp(
        &self,
        id: &str,
        data: &HashMap<String, serde_json::Value>,
    ) -> Result<(), DamError> {
        self.xmp_edits.lock().unwrap().push(XmpRecord {
            asset_id: id.to_string(),
            data: data.clone(),
        });
        Ok(())
    }

    async fn get_asset_metadata(
        &self,
        _id: &str,
    ) -> Result<HashMap<String, serde_json::Value>, DamError> {
        Ok(HashMap::new())
    }

    async fn get_notifications(
        &self,
        limit: i64,
        offset: i64,
        starttime: Timestamp,
        endtime: Timestamp,
    ) -> Result<NotificationsPage, DamError> {
        self.notification_requests
            .lock()
            .unwrap()
            .push(NotificationRequest {
                limit,
                offset,
                starttime,
                endtime,
            });
        self.notification_pages
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Self::exhausted("notifications"))
    }
}

#[derive(Default)]
pub struct MemoryState {
    values: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryState {
    pub fn get_sync(&self, key: &str) -> Option<serde_json::Value> {
        self.values.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl StateStore for MemoryState {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CoreError> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), CoreError> {
        self.values.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryAssetData {
    values: Mutex<HashMap<(String, String), serde_json::Value>>,
}

impl MemoryAssetData {
    pub fn get_sync(&self, asset_id: &str, data_key: &str) -> Option<serde_json::Value> {
        self.values
            .lock()
            .unwrap()
            .get(&(asset_id.to_string(), data_key.to_string()))
            .cloned()
    }

    pub fn set_sync(&self, asset_id: &str, data_key: &str, value: serde_json::Value) {
        self.values
            .lock()
            .unwrap()
            .insert((asset_id.to_string(), data_key.to_string()), value);
    }
}

#[async_trait]
impl AssetDataStore for MemoryAssetData {
    async fn get(
        &self,
        asset_id: &str,
        data_key: &str,
    ) -> Result<Option<serde_json::Value>, CoreError> {
        Ok(self.get_sync(asset_id, data_key))
    }

    async fn set(
        &self,
        asset_id: &str,
        data_key: &str,
        value: serde_json::Value,
    ) -> Result<(), CoreError> {
        self.set_sync(asset_id, data_key, value);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryRecords {
    records: Mutex<HashMap<DbId, LocalRecord>>,
}

impl MemoryRecords {
    pub fn add(&self, bundle: &str, asset_id: &str, id: DbId) {
        self.records.lock().unwrap().insert(
            id,
            LocalRecord {
                id,
                bundle: bundle.to_string(),
                asset_id: asset_id.to_string(),
                file_path: Some(format!("files/{asset_id}.bin")),
                last_upload_date: None,
                thumbnail_stale: false,
                changed_at: Utc::now(),
            },
        );
    }

    pub fn load_sync(&self, id: DbId) -> LocalRecord {
        self.records.lock().unwrap()[&id].clone()
    }
}

#[async_trait]
impl RecordStore for MemoryRecords {
    async fn ids_referencing(
        &self,
        bundles: &[String],
        asset_ids: &[String],
    ) -> Result<Vec<DbId>, CoreError> {
        let records = self.records.lock().unwrap();
        let mut ids: Vec<DbId> = records
            .values()
            .filter(|r| bundles.contains(&r.bundle) && asset_ids.contains(&r.asset_id))
            .map(|r| r.id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn load(&self, id: DbId) -> Result<Option<LocalRecord>, CoreError> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    async fn apply_refresh(
        &self,
        id: DbId,
        last_upload_date: Option<&str>,
    ) -> Result<(), CoreError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&id)
            .ok_or_else(|| CoreError::Storage(format!("no record {id}")))?;
        record.file_path = None;
        record.thumbnail_stale = true;
        record.last_upload_date = last_upload_date.map(str::to_string);
        record.changed_at = Utc::now();
        Ok(())
    }
}

struct QueueEntry {
    id: DbId,
    payload: serde_json::Value,
    claimed: bool,
}

#[derive(Default)]
struct QueueState {
    entries: Vec<QueueEntry>,
    next_id: DbId,
    delays: Vec<Duration>,
}

#[derive(Default)]
pub struct MemoryQueue {
    state: Mutex<QueueState>,
}

impl MemoryQueue {
    /// All payloads currently in the queue, claimed or not, in
    /// insertion order.
    pub fn snapshot(&self) -> Vec<serde_json::Value> {
        self.state
            .lock()
            .unwrap()
            .entries
            .iter()
            .map(|e| e.payload.clone())
            .collect()
    }

    /// Delays passed to `push_delayed`, in call order.
    pub fn delays(&self) -> Vec<Duration> {
        self.state.lock().unwrap().delays.clone()
    }

    fn insert(&self, payload: serde_json::Value) {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state.entries.push(QueueEntry {
            id,
            payload,
            claimed: false,
        });
    }
}

#[async_trait]
impl WorkQueue for MemoryQueue {
    async fn push(&self, payload: serde_json::Value) -> Result<(), CoreError> {
        self.insert(payload);
        Ok(())
    }

    async fn push_delayed(
        &self,
        payload: serde_json::Value,
        delay: Duration,
    ) -> Result<(), CoreError> {
        self.state.lock().unwrap().delays.push(delay);
        self.insert(payload);
        Ok(())
    }

    async fn claim(&self) -> Result<Option<ClaimedItem>, CoreError> {
        let mut state = self.state.lock().unwrap();
        for entry in &mut state.entries {
            if !entry.claimed {
                entry.claimed = true;
                return Ok(Some(ClaimedItem {
                    id: entry.id,
                    payload: entry.payload.clone(),
                }));
            }
        }
        Ok(None)
    }

    async fn delete(&self, item_id: DbId) -> Result<(), CoreError> {
        self.state
            .lock()
            .unwrap()
            .entries
            .retain(|e| e.id != item_id);
        Ok(())
    }

    async fn release(&self, item_id: DbId) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        for entry in &mut state.entries {
            if entry.id == item_id {
                entry.claimed = false;
            }
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64, CoreError> {
        Ok(self.state.lock().unwrap().entries.len() as i64)
    }

    async fn clear(&self) -> Result<(), CoreError> {
        self.state.lock().unwrap().entries.clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct NullTransfer;

#[async_trait]
impl FileTransfer for NullTransfer {
    async fn fetch_to_file(&self, _url: &str, _dest: &Path) -> Result<(), CoreError> {
        Ok(())
    }
}
