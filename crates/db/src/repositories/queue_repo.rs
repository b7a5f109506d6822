//! Repository for the `queue_items` table.
//!
//! A minimal durable at-least-once queue: items become claimable when
//! `available_at` passes and no live claim (`claimed_until`) covers
//! them. Claims use `FOR UPDATE SKIP LOCKED` so concurrent drains
//! never hand out the same item twice, and a crashed consumer's claim
//! simply lapses at the visibility timeout.

use std::time::Duration;

use sqlx::PgPool;

use damlink_core::types::DbId;

use crate::models::QueueItemRow;

/// Column list for `queue_items` queries.
const COLUMNS: &str = "id, queue_name, payload, available_at, claimed_until, created_at";

/// Provides queue operations over `queue_items`.
pub struct QueueRepo;

impl QueueRepo {
    /// Enqueue a payload, immediately available.
    pub async fn push(
        pool: &PgPool,
        queue_name: &str,
        payload: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO queue_items (queue_name, payload) VALUES ($1, $2) RETURNING id",
        )
        .bind(queue_name)
        .bind(payload)
        .fetch_one(pool)
        .await
    }

    /// Enqueue a payload that becomes available after `delay`.
    pub async fn push_delayed(
        pool: &PgPool,
        queue_name: &str,
        payload: &serde_json::Value,
        delay: Duration,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO queue_items (queue_name, payload, available_at) \
             VALUES ($1, $2, NOW() + make_interval(secs => $3)) \
             RETURNING id",
        )
        .bind(queue_name)
        .bind(payload)
        .bind(delay.as_secs_f64())
        .fetch_one(pool)
        .await
    }

    /// Atomically claim the next available item for `visibility`.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` to prevent double-delivery
    /// across concurrent consumers; items whose previous claim lapsed
    /// are claimable again (at-least-once delivery).
    pub async fn claim_next(
        pool: &PgPool,
        queue_name: &str,
        visibility: Duration,
    ) -> Result<Option<QueueItemRow>, sqlx::Error> {
        let query = format!(
            "UPDATE queue_items \
             SET claimed_until = NOW() + make_interval(secs => $2) \
             WHERE id = ( \
                 SELECT id FROM queue_items \
                 WHERE queue_name = $1 \
                   AND available_at <= NOW() \
                   AND (claimed_until IS NULL OR claimed_until <= NOW()) \
                 ORDER BY available_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueueItemRow>(&query)
            .bind(queue_name)
            .bind(visibility.as_secs_f64())
            .fetch_optional(pool)
            .await
    }

    /// Remove a processed item.
    pub async fn delete(pool: &PgPool, item_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM queue_items WHERE id = $1")
            .bind(item_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Drop a claim so the item is immediately available again.
    pub async fn release(pool: &PgPool, item_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE queue_items SET claimed_until = NULL WHERE id = $1")
            .bind(item_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Number of items currently in the queue, claimed or not.
    pub async fn count(pool: &PgPool, queue_name: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM queue_items WHERE queue_name = $1")
            .bind(queue_name)
            .fetch_one(pool)
            .await
    }

    /// Delete every item in the queue.
    pub async fn clear(pool: &PgPool, queue_name: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM queue_items WHERE queue_name = $1")
            .bind(queue_name)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
