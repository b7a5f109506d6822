use sqlx::FromRow;

use damlink_core::record::LocalRecord;
use damlink_core::types::{DbId, Timestamp};

/// A row from the `local_records` table.
#[derive(Debug, Clone, FromRow)]
pub struct LocalRecordRow {
    pub id: DbId,
    pub bundle: String,
    pub asset_id: String,
    pub file_path: Option<String>,
    pub last_upload_date: Option<String>,
    pub thumbnail_stale: bool,
    pub changed_at: Timestamp,
    pub created_at: Timestamp,
}

impl From<LocalRecordRow> for LocalRecord {
    fn from(row: LocalRecordRow) -> Self {
        LocalRecord {
            id: row.id,
            bundle: row.bundle,
            asset_id: row.asset_id,
            file_path: row.file_path,
            last_upload_date: row.last_upload_date,
            thumbnail_stale: row.thumbnail_stale,
            changed_at: row.changed_at,
        }
    }
}
