//! Database tests, organized by domain.

mod sessions;
mod videos;

use super::Database;
use crate::types::{ContentAnalysis, ScoredVideo, VideoDetails};
use chrono::Utc;
use tempfile::TempDir;

/// Create a fresh on-disk test database inside a temp directory.
///
/// The TempDir must be kept alive for the duration of the test.
pub(crate) async fn test_db() -> (Database, TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let db = Database::new(&dir.path().join("test.db"))
        .await
        .expect("create test database");
    (db, dir)
}

/// A scored video with sensible defaults for cache tests.
pub(crate) fn scored_video(video_id: &str, relevant: bool) -> ScoredVideo {
    ScoredVideo {
        details: VideoDetails {
            video_id: video_id.to_string(),
            title: format!("Video {}", video_id),
            description: "a description".to_string(),
            published_at: Some(Utc::now()),
            channel_id: "channel-1".to_string(),
            channel_title: "Test Channel".to_string(),
            channel_country: None,
            tags: vec!["one".to_string(), "two".to_string()],
            category_id: None,
            default_language: None,
            view_count: 1_000,
            like_count: 50,
            comment_count: 10,
            duration: "PT5M".to_string(),
            hd: true,
            captions: false,
        },
        relevance_score: if relevant { 0.6 } else { 0.1 },
        quality_score: 0.7,
        engagement_score: 0.4,
        spam_score: 0.0,
        composite_score: if relevant { 0.53 } else { 0.33 },
        is_relevant: relevant,
        analysis: ContentAnalysis {
            matched_locations: vec![],
            matched_cultural_terms: vec![],
            detected_language: "english".to_string(),
            content_category: "general".to_string(),
        },
        search_query: "test".to_string(),
        video_url: format!("https://example.com/watch?v={}", video_id),
        extracted_at: Utc::now(),
    }
}

#[tokio::test]
async fn opening_the_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reopen.db");

    let db = Database::new(&path).await.unwrap();
    db.mark_seen("vid-1").await.unwrap();
    db.close().await;

    // Second open must not re-run migrations destructively
    let db = Database::new(&path).await.unwrap();
    assert_eq!(db.seen_count().await.unwrap(), 1);
}
