//! Shared test doubles for harvester tests.

use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result, SourceError};
use crate::sink::{PersistReport, VideoSink};
use crate::source::{SearchOptions, SearchSource};
use crate::types::{ScoredVideo, VideoDetails, VideoRef};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Scripted in-memory search source.
#[derive(Default)]
pub(crate) struct MockSource {
    by_query: Mutex<HashMap<String, Vec<VideoDetails>>>,
    /// query -> error kind ("transient" | "quota" | "fatal")
    fail_queries: Mutex<HashMap<String, &'static str>>,
    /// credentials that always hit a quota wall
    quota_keys: Mutex<HashSet<String>>,
    /// artificial latency per search call, for stop/concurrency tests
    delay: Mutex<Duration>,
    pub(crate) search_calls: AtomicU32,
}

impl MockSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_results(self, query: &str, details: Vec<VideoDetails>) -> Self {
        self.by_query
            .lock()
            .unwrap()
            .insert(query.to_string(), details);
        self
    }

    pub(crate) fn failing_query(self, query: &str, kind: &'static str) -> Self {
        self.fail_queries
            .lock()
            .unwrap()
            .insert(query.to_string(), kind);
        self
    }

    pub(crate) fn with_quota_key(self, key: &str) -> Self {
        self.quota_keys.lock().unwrap().insert(key.to_string());
        self
    }

    pub(crate) fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = delay;
        self
    }
}

#[async_trait]
impl SearchSource for MockSource {
    async fn search(
        &self,
        credential: &str,
        query: &str,
        _options: &SearchOptions,
    ) -> Result<Vec<VideoRef>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.quota_keys.lock().unwrap().contains(credential) {
            return Err(Error::Source(SourceError::QuotaExceeded(
                "daily quota exhausted".to_string(),
            )));
        }

        if let Some(kind) = self.fail_queries.lock().unwrap().get(query) {
            return Err(match *kind {
                "transient" => Error::Source(SourceError::Transient("backend glitch".into())),
                "quota" => Error::Source(SourceError::QuotaExceeded("quota".into())),
                _ => Error::Source(SourceError::BadRequest("scripted failure".into())),
            });
        }

        let refs = self
            .by_query
            .lock()
            .unwrap()
            .get(query)
            .map(|details| {
                details
                    .iter()
                    .map(|d| VideoRef {
                        video_id: d.video_id.clone(),
                        title: d.title.clone(),
                        channel_id: d.channel_id.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(refs)
    }

    async fn fetch_details(&self, _credential: &str, ids: &[String]) -> Result<Vec<VideoDetails>> {
        let by_query = self.by_query.lock().unwrap();
        let mut details = Vec::new();
        for id in ids {
            for candidates in by_query.values() {
                if let Some(found) = candidates.iter().find(|d| &d.video_id == id) {
                    details.push(found.clone());
                    break;
                }
            }
        }
        Ok(details)
    }
}

/// Collecting in-memory sink with scriptable failures.
#[derive(Default)]
pub(crate) struct MockSink {
    pub(crate) persisted: Mutex<Vec<ScoredVideo>>,
    pub(crate) fail_completely: AtomicBool,
    reject_ids: Mutex<HashSet<String>>,
}

impl MockSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn rejecting(self, video_id: &str) -> Self {
        self.reject_ids.lock().unwrap().insert(video_id.to_string());
        self
    }

    pub(crate) fn persisted_ids(&self) -> Vec<String> {
        self.persisted
            .lock()
            .unwrap()
            .iter()
            .map(|v| v.details.video_id.clone())
            .collect()
    }
}

#[async_trait]
impl VideoSink for MockSink {
    async fn persist(&self, items: &[ScoredVideo]) -> Result<PersistReport> {
        if self.fail_completely.load(Ordering::SeqCst) {
            return Err(Error::Sink("warehouse unavailable".to_string()));
        }

        let mut report = PersistReport::default();
        let rejected = self.reject_ids.lock().unwrap();
        for item in items {
            if rejected.contains(&item.details.video_id) {
                report
                    .errors
                    .push(format!("{}: rejected", item.details.video_id));
            } else {
                report.persisted.push(item.details.video_id.clone());
                self.persisted.lock().unwrap().push(item.clone());
            }
        }
        Ok(report)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A detail record whose title makes it score as relevant.
pub(crate) fn relevant_video(id: &str) -> VideoDetails {
    VideoDetails {
        video_id: id.to_string(),
        title: format!("Sri Lanka Colombo feature {}", id),
        description: "footage from the island".to_string(),
        published_at: None,
        channel_id: "ch-test".to_string(),
        channel_title: "Test Channel".to_string(),
        channel_country: None,
        tags: vec![],
        category_id: None,
        default_language: None,
        view_count: 1_000,
        like_count: 50,
        comment_count: 10,
        duration: "PT5M".to_string(),
        hd: true,
        captions: true,
    }
}

/// A detail record with no regional signals at all.
pub(crate) fn irrelevant_video(id: &str) -> VideoDetails {
    VideoDetails {
        video_id: id.to_string(),
        title: format!("Generic daily upload {}", id),
        description: "nothing in particular".to_string(),
        published_at: None,
        channel_id: "ch-test".to_string(),
        channel_title: "Test Channel".to_string(),
        channel_country: None,
        tags: vec![],
        category_id: None,
        default_language: None,
        view_count: 10,
        like_count: 0,
        comment_count: 0,
        duration: "PT1M".to_string(),
        hd: false,
        captions: false,
    }
}

/// Test configuration: two credentials, no pacing delays, fast retries.
pub(crate) fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.credentials.api_keys = vec!["test-key-a".to_string(), "test-key-b".to_string()];
    config.persistence.database_path = dir.path().join("harvest.db");
    config.strategies.delay_between = Duration::ZERO;
    config.retry.initial_delay = Duration::from_millis(5);
    config.retry.max_delay = Duration::from_millis(20);
    config.retry.jitter = false;
    config
}

/// Build a harvester around scripted source/sink doubles.
pub(crate) async fn harvester_with(
    source: std::sync::Arc<MockSource>,
    sink: std::sync::Arc<MockSink>,
) -> (super::VideoHarvester, TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = test_config(&dir);
    let db = std::sync::Arc::new(
        Database::new(&config.persistence.database_path)
            .await
            .expect("create test database"),
    );

    let harvester = super::VideoHarvester::with_components(config, db, source, sink)
        .expect("build harvester");
    (harvester, dir)
}
