//! Extraction session CRUD and typed state transitions.
//!
//! Session updates are a closed set of operations: progress upserts while
//! running, and exactly one of the terminal transitions
//! ([`Database::mark_session_completed`], [`Database::mark_session_failed`],
//! [`Database::mark_session_stopped`]). There is no generic field-by-field
//! update path.

use crate::error::DatabaseError;
use crate::types::{RunMode, SessionId, SessionStatus};
use crate::{Error, Result};
use chrono::Utc;

use super::{Database, SessionRow};

/// Running counters for a session progress upsert
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionProgress {
    /// Strategies completed so far
    pub completed_strategies: u32,
    /// Items fetched and scored so far
    pub items_extracted: u64,
    /// Items accepted as relevant so far
    pub relevant_items: u64,
    /// Strategy-level errors recorded so far
    pub error_count: u64,
}

impl Database {
    /// Insert a new session in the Running state.
    pub async fn insert_session(
        &self,
        session_id: &SessionId,
        mode: RunMode,
        total_strategies: u32,
        configuration: Option<&serde_json::Value>,
    ) -> Result<()> {
        let configuration = configuration.map(|c| c.to_string());

        sqlx::query(
            r#"
            INSERT INTO extraction_sessions
                (session_id, mode, status, started_at, total_strategies, configuration)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(session_id.as_str())
        .bind(mode.to_string())
        .bind(SessionStatus::Running.to_i32())
        .bind(Utc::now().timestamp())
        .bind(total_strategies as i64)
        .bind(configuration)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert session: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Update the running counters of an active session.
    pub async fn update_session_progress(
        &self,
        session_id: &SessionId,
        progress: SessionProgress,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE extraction_sessions
            SET completed_strategies = ?, items_extracted = ?, relevant_items = ?, error_count = ?
            WHERE session_id = ?
            "#,
        )
        .bind(progress.completed_strategies as i64)
        .bind(progress.items_extracted as i64)
        .bind(progress.relevant_items as i64)
        .bind(progress.error_count as i64)
        .bind(session_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update session progress: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Transition a session to Completed with its final counters.
    pub async fn mark_session_completed(
        &self,
        session_id: &SessionId,
        progress: SessionProgress,
    ) -> Result<()> {
        self.update_session_progress(session_id, progress).await?;
        self.finish_session(session_id, SessionStatus::Completed).await
    }

    /// Transition a session to Failed.
    pub async fn mark_session_failed(&self, session_id: &SessionId) -> Result<()> {
        self.finish_session(session_id, SessionStatus::Failed).await
    }

    /// Transition a session to Stopped.
    pub async fn mark_session_stopped(&self, session_id: &SessionId) -> Result<()> {
        self.finish_session(session_id, SessionStatus::Stopped).await
    }

    async fn finish_session(&self, session_id: &SessionId, status: SessionStatus) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE extraction_sessions
            SET status = ?, ended_at = ?
            WHERE session_id = ? AND status = ?
            "#,
        )
        .bind(status.to_i32())
        .bind(Utc::now().timestamp())
        .bind(session_id.as_str())
        .bind(SessionStatus::Running.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to finish session: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Fetch one session by identifier.
    pub async fn get_session(&self, session_id: &SessionId) -> Result<Option<SessionRow>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT
                id, session_id, mode, status, started_at, ended_at,
                total_strategies, completed_strategies, items_extracted,
                relevant_items, error_count, configuration
            FROM extraction_sessions
            WHERE session_id = ?
            LIMIT 1
            "#,
        )
        .bind(session_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to fetch session: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// The most recently started session, if any.
    pub async fn latest_session(&self) -> Result<Option<SessionRow>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT
                id, session_id, mode, status, started_at, ended_at,
                total_strategies, completed_strategies, items_extracted,
                relevant_items, error_count, configuration
            FROM extraction_sessions
            ORDER BY started_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to fetch latest session: {}",
                e
            )))
        })?;

        Ok(row)
    }
}
