//! Repository for the `local_records` table.

use sqlx::PgPool;

use damlink_core::types::DbId;

use crate::models::LocalRecordRow;

/// Column list for `local_records` queries.
const COLUMNS: &str =
    "id, bundle, asset_id, file_path, last_upload_date, thumbnail_stale, changed_at, created_at";

/// Provides queries over the host system's local records.
pub struct LocalRecordRepo;

impl LocalRecordRepo {
    /// Ids of records in any of `bundles` referencing any of
    /// `asset_ids`.
    pub async fn ids_referencing(
        pool: &PgPool,
        bundles: &[String],
        asset_ids: &[String],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT DISTINCT id FROM local_records \
             WHERE bundle = ANY($1) AND asset_id = ANY($2)",
        )
        .bind(bundles)
        .bind(asset_ids)
        .fetch_all(pool)
        .await
    }

    pub async fn load(pool: &PgPool, id: DbId) -> Result<Option<LocalRecordRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM local_records WHERE id = $1");
        sqlx::query_as::<_, LocalRecordRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Apply a completed remote refresh: drop the cached file reference
    /// so it is re-derived from the fresh asset, mark the thumbnail
    /// stale, bump the changed timestamp, and store the upload-date
    /// marker.
    pub async fn apply_refresh(
        pool: &PgPool,
        id: DbId,
        last_upload_date: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE local_records \
             SET file_path = NULL, thumbnail_stale = TRUE, \
                 last_upload_date = $2, changed_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(last_upload_date)
        .execute(pool)
        .await?;
        Ok(())
    }
}
