use sqlx::FromRow;

use damlink_core::types::{DbId, Timestamp};

/// A row from the `queue_items` table.
#[derive(Debug, Clone, FromRow)]
pub struct QueueItemRow {
    pub id: DbId,
    pub queue_name: String,
    pub payload: serde_json::Value,
    pub available_at: Timestamp,
    /// Non-null while a consumer holds the item; the claim lapses at
    /// this instant (visibility timeout) and the item becomes
    /// claimable again.
    pub claimed_until: Option<Timestamp>,
    pub created_at: Timestamp,
}
