//! Harvested video cache tests.

use super::{scored_video, test_db};

#[tokio::test]
async fn batch_save_writes_every_row() {
    let (db, _dir) = test_db().await;

    let batch = vec![
        scored_video("vid-1", true),
        scored_video("vid-2", false),
        scored_video("vid-3", true),
    ];

    let saved = db.save_videos_batch(&batch).await.unwrap();
    assert_eq!(saved, 3);

    let stats = db.cache_stats().await.unwrap();
    assert_eq!(stats.total_videos, 3);
    assert_eq!(stats.relevant_videos, 2);
}

#[tokio::test]
async fn saving_the_same_video_twice_upserts() {
    let (db, _dir) = test_db().await;

    let mut video = scored_video("vid-1", false);
    db.save_videos_batch(std::slice::from_ref(&video)).await.unwrap();

    video.is_relevant = true;
    video.composite_score = 0.9;
    db.save_videos_batch(std::slice::from_ref(&video)).await.unwrap();

    let stats = db.cache_stats().await.unwrap();
    assert_eq!(stats.total_videos, 1, "same id must not create a second row");
    assert_eq!(stats.relevant_videos, 1, "second write wins");
}

#[tokio::test]
async fn search_filters_by_text_and_relevance() {
    let (db, _dir) = test_db().await;

    let mut colombo = scored_video("vid-1", true);
    colombo.details.title = "Colombo harbour tour".to_string();
    let mut kandy = scored_video("vid-2", false);
    kandy.details.title = "Kandy lake walk".to_string();

    db.save_videos_batch(&[colombo, kandy]).await.unwrap();

    let hits = db.search_videos("colombo", false, 10).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].video_id, "vid-1");

    let relevant_hits = db.search_videos("kandy", true, 10).await.unwrap();
    assert!(relevant_hits.is_empty(), "vid-2 is not relevant");

    let all_hits = db.search_videos("", false, 10).await.unwrap();
    assert_eq!(all_hits.len(), 2);
}

#[tokio::test]
async fn cached_rows_round_trip_tags_and_scores() {
    let (db, _dir) = test_db().await;

    let video = scored_video("vid-1", true);
    db.save_videos_batch(std::slice::from_ref(&video)).await.unwrap();

    let hits = db.search_videos("vid-1", false, 10).await.unwrap();
    let cached = &hits[0];

    assert_eq!(cached.tags, vec!["one".to_string(), "two".to_string()]);
    assert_eq!(cached.composite_score, video.composite_score);
    assert_eq!(cached.duration, "PT5M");
    assert!(cached.is_relevant);
    assert_eq!(cached.search_query, "test");
}

#[tokio::test]
async fn top_channels_requires_at_least_two_videos() {
    let (db, _dir) = test_db().await;

    let mut a1 = scored_video("vid-1", true);
    a1.details.channel_id = "busy".to_string();
    let mut a2 = scored_video("vid-2", true);
    a2.details.channel_id = "busy".to_string();
    let mut b1 = scored_video("vid-3", true);
    b1.details.channel_id = "quiet".to_string();

    db.save_videos_batch(&[a1, a2, b1]).await.unwrap();

    let channels = db.top_channels(false, 10).await.unwrap();
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].channel_id, "busy");
    assert_eq!(channels[0].video_count, 2);
}

#[tokio::test]
async fn empty_cache_stats_are_zeroed() {
    let (db, _dir) = test_db().await;

    let stats = db.cache_stats().await.unwrap();
    assert_eq!(stats.total_videos, 0);
    assert_eq!(stats.relevant_videos, 0);
    assert_eq!(stats.avg_composite_score, 0.0);
    assert_eq!(stats.seen_records, 0);
}
