//! Freshness-windowed deduplication store.
//!
//! A seen-record marks an item as already persisted. Records older than the
//! configured freshness window are treated as absent for deduplication even
//! though they are not physically deleted; physical deletion is a retention
//! concern handled separately by [`Database::purge_seen_older_than`].

use crate::error::DatabaseError;
use crate::{Error, Result};
use chrono::Utc;
use std::time::Duration;

use super::Database;

impl Database {
    /// True iff a seen-record exists within the freshness window.
    pub async fn is_recently_seen(&self, video_id: &str, window: Duration) -> Result<bool> {
        let cutoff = Utc::now().timestamp() - window.as_secs() as i64;

        let row: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM seen_videos WHERE video_id = ? AND last_seen_at > ?",
        )
        .bind(video_id)
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to check seen record: {}",
                e
            )))
        })?;

        Ok(row.is_some())
    }

    /// Idempotent upsert of the seen-record for an item, stamped now.
    pub async fn mark_seen(&self, video_id: &str) -> Result<()> {
        self.mark_seen_at(video_id, Utc::now().timestamp()).await
    }

    /// Upsert a seen-record with an explicit timestamp.
    pub(crate) async fn mark_seen_at(&self, video_id: &str, last_seen_at: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO seen_videos (video_id, last_seen_at)
            VALUES (?, ?)
            ON CONFLICT(video_id) DO UPDATE SET last_seen_at = excluded.last_seen_at
            "#,
        )
        .bind(video_id)
        .bind(last_seen_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to upsert seen record: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Number of seen-records currently stored (fresh or stale).
    pub async fn seen_count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM seen_videos")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count seen records: {}",
                    e
                )))
            })?;

        Ok(count.max(0) as u64)
    }

    /// Delete seen-records older than the cutoff. Returns the number removed.
    pub async fn purge_seen_older_than(&self, age: Duration) -> Result<u64> {
        let cutoff = Utc::now().timestamp() - age.as_secs() as i64;

        let result = sqlx::query("DELETE FROM seen_videos WHERE last_seen_at <= ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to purge seen records: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected())
    }
}
