//! Downstream persistence interface
//!
//! Accepted items leave the orchestrator through the [`VideoSink`] trait.
//! Implementations must be idempotent on the item identifier: persisting the
//! same item twice is safe. The built-in [`DatabaseSink`] writes into the
//! local cache database; warehouse or object-store adapters implement the
//! same trait out of tree.

use crate::db::Database;
use crate::error::Result;
use crate::types::ScoredVideo;
use async_trait::async_trait;
use std::sync::Arc;

/// Outcome of one persistence batch.
///
/// A sink may persist part of a batch; the orchestrator only marks the ids in
/// `persisted` as seen, so rejected items stay eligible for re-extraction.
#[derive(Debug, Default, Clone)]
pub struct PersistReport {
    /// Item ids the sink durably accepted
    pub persisted: Vec<String>,
    /// Per-item failure descriptions
    pub errors: Vec<String>,
}

impl PersistReport {
    /// Number of items durably accepted
    pub fn persisted_count(&self) -> u64 {
        self.persisted.len() as u64
    }
}

/// Destination for accepted (relevant) items.
#[async_trait]
pub trait VideoSink: Send + Sync {
    /// Persist a batch of scored items. Must be idempotent per item id.
    async fn persist(&self, items: &[ScoredVideo]) -> Result<PersistReport>;

    /// Short implementation name for logs and status.
    fn name(&self) -> &str;
}

/// Built-in sink that persists accepted items into the local cache database.
pub struct DatabaseSink {
    db: Arc<Database>,
}

impl DatabaseSink {
    /// Create a sink backed by the given database.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VideoSink for DatabaseSink {
    async fn persist(&self, items: &[ScoredVideo]) -> Result<PersistReport> {
        let mut report = PersistReport::default();

        for item in items {
            match self.db.save_videos_batch(std::slice::from_ref(item)).await {
                Ok(1) => report.persisted.push(item.details.video_id.clone()),
                Ok(_) => report.errors.push(format!(
                    "{}: row not written",
                    item.details.video_id
                )),
                Err(e) => report
                    .errors
                    .push(format!("{}: {}", item.details.video_id, e)),
            }
        }

        Ok(report)
    }

    fn name(&self) -> &str {
        "database"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{scored_video, test_db};

    #[tokio::test]
    async fn database_sink_persists_and_reports_ids() {
        let (db, _dir) = test_db().await;
        let sink = DatabaseSink::new(Arc::new(db));

        let batch = vec![scored_video("vid-1", true), scored_video("vid-2", true)];
        let report = sink.persist(&batch).await.unwrap();

        assert_eq!(report.persisted_count(), 2);
        assert_eq!(report.persisted, vec!["vid-1", "vid-2"]);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn database_sink_is_idempotent_per_item() {
        let (db, _dir) = test_db().await;
        let db = Arc::new(db);
        let sink = DatabaseSink::new(db.clone());

        let batch = vec![scored_video("vid-1", true)];
        sink.persist(&batch).await.unwrap();
        let report = sink.persist(&batch).await.unwrap();

        assert_eq!(report.persisted_count(), 1, "second persist is safe");
        assert_eq!(db.cache_stats().await.unwrap().total_videos, 1);
    }

    #[tokio::test]
    async fn empty_batch_produces_empty_report() {
        let (db, _dir) = test_db().await;
        let sink = DatabaseSink::new(Arc::new(db));

        let report = sink.persist(&[]).await.unwrap();
        assert_eq!(report.persisted_count(), 0);
        assert!(report.errors.is_empty());
    }
}
