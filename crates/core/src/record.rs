//! Local record referencing one remote asset.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

/// A host-system record holding a foreign reference to one remote
/// asset. Created when a user attaches an asset; updated by the refresh
/// worker; never created by the sync engine itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalRecord {
    pub id: DbId,
    /// Record type the host system groups records under.
    pub bundle: String,
    /// Identifier of the referenced remote asset.
    pub asset_id: String,
    /// Locally-cached file, if one has been fetched.
    pub file_path: Option<String>,
    /// The asset's `file_upload_date` as of the last sync. Opaque;
    /// compared for inequality only.
    pub last_upload_date: Option<String>,
    /// Set when the cached thumbnail no longer matches the remote asset.
    pub thumbnail_stale: bool,
    pub changed_at: Timestamp,
}
