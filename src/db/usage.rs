//! Per-attempt request outcome log.
//!
//! Every attempt against the search source is recorded here, success or
//! failure, keyed by the credential's display hash. The log feeds
//! observability only; availability decisions live in the credential pool.

use crate::error::DatabaseError;
use crate::{Error, Result};
use chrono::Utc;

use super::Database;

impl Database {
    /// Append one request outcome to the usage log.
    pub async fn log_usage(
        &self,
        credential_hash: &str,
        request_kind: &str,
        success: bool,
        quota_error: bool,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO api_usage_log
                (credential_hash, request_kind, success, quota_error, occurred_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(credential_hash)
        .bind(request_kind)
        .bind(success as i64)
        .bind(quota_error as i64)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to log usage: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// (total, successful) request counts over the trailing 24 hours.
    pub async fn usage_last_24h(&self) -> Result<(u64, u64)> {
        let cutoff = Utc::now().timestamp() - 24 * 60 * 60;

        let (total, successful): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(success), 0)
            FROM api_usage_log
            WHERE occurred_at > ?
            "#,
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to summarize usage: {}",
                e
            )))
        })?;

        Ok((total.max(0) as u64, successful.max(0) as u64))
    }
}
