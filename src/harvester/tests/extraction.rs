//! End-to-end extraction flow tests with scripted source/sink doubles.

use crate::harvester::test_helpers::{
    MockSink, MockSource, harvester_with, irrelevant_video, relevant_video,
};
use crate::types::{RunParams, SessionStatus};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

#[tokio::test]
async fn full_flow_scores_filters_and_persists() {
    let source = Arc::new(MockSource::new().with_results(
        "colombo",
        vec![
            relevant_video("vid-1"),
            irrelevant_video("vid-2"),
            relevant_video("vid-3"),
        ],
    ));
    let sink = Arc::new(MockSink::new());
    let (harvester, _dir) = harvester_with(source, sink.clone()).await;

    let session_id = harvester
        .start_single("colombo", RunParams::default())
        .await
        .unwrap();
    harvester.wait_until_idle().await;

    // Session finished with the right counters
    let row = harvester
        .db
        .get_session(&session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(SessionStatus::from_i32(row.status), SessionStatus::Completed);
    assert_eq!(row.items_extracted, 3, "all fetched items are scored");
    assert_eq!(row.relevant_items, 2, "only relevant items are accepted");
    assert_eq!(row.error_count, 0);
    assert_eq!(row.completed_strategies, 1);

    // The sink received exactly the accepted items
    assert_eq!(sink.persisted_ids(), vec!["vid-1", "vid-3"]);

    // Seen-store touched only for persisted items
    let day = Duration::from_secs(24 * 60 * 60);
    assert!(harvester.db.is_recently_seen("vid-1", day).await.unwrap());
    assert!(harvester.db.is_recently_seen("vid-3", day).await.unwrap());
    assert!(
        !harvester.db.is_recently_seen("vid-2", day).await.unwrap(),
        "rejected items are not marked seen"
    );

    // The local cache holds every scored item for the query surface
    let stats = harvester.db.cache_stats().await.unwrap();
    assert_eq!(stats.total_videos, 3);
    assert_eq!(stats.relevant_videos, 2);
}

#[tokio::test]
async fn fresh_items_are_skipped_before_scoring() {
    let source = Arc::new(MockSource::new().with_results(
        "colombo",
        vec![relevant_video("vid-1"), relevant_video("vid-2")],
    ));
    let sink = Arc::new(MockSink::new());
    let (harvester, _dir) = harvester_with(source, sink.clone()).await;

    // vid-1 was persisted recently
    harvester.db.mark_seen("vid-1").await.unwrap();

    let session_id = harvester
        .start_single("colombo", RunParams::default())
        .await
        .unwrap();
    harvester.wait_until_idle().await;

    let row = harvester
        .db
        .get_session(&session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.items_extracted, 1, "fresh item is skipped before scoring");
    assert_eq!(sink.persisted_ids(), vec!["vid-2"]);
}

#[tokio::test]
async fn stale_seen_records_do_not_suppress_re_extraction() {
    let source = Arc::new(
        MockSource::new().with_results("colombo", vec![relevant_video("vid-1")]),
    );
    let sink = Arc::new(MockSink::new());
    let (harvester, _dir) = harvester_with(source, sink.clone()).await;

    // Seen 25 hours ago: outside the default 24h freshness window
    let stale = chrono::Utc::now().timestamp() - 25 * 60 * 60;
    harvester.db.mark_seen_at("vid-1", stale).await.unwrap();

    harvester
        .start_single("colombo", RunParams::default())
        .await
        .unwrap();
    harvester.wait_until_idle().await;

    assert_eq!(sink.persisted_ids(), vec!["vid-1"]);
}

#[tokio::test]
async fn sink_failure_keeps_items_eligible_for_next_run() {
    let source = Arc::new(
        MockSource::new().with_results("colombo", vec![relevant_video("vid-1")]),
    );
    let sink = Arc::new(MockSink::new());
    sink.fail_completely.store(true, Ordering::SeqCst);
    let (harvester, _dir) = harvester_with(source, sink.clone()).await;

    let first = harvester
        .start_single("colombo", RunParams::default())
        .await
        .unwrap();
    harvester.wait_until_idle().await;

    let row = harvester.db.get_session(&first).await.unwrap().unwrap();
    assert_eq!(
        SessionStatus::from_i32(row.status),
        SessionStatus::Completed,
        "a sink failure never aborts the run"
    );
    assert_eq!(row.error_count, 1, "the sink failure is counted");
    assert_eq!(row.relevant_items, 1);

    let day = Duration::from_secs(24 * 60 * 60);
    assert!(
        !harvester.db.is_recently_seen("vid-1", day).await.unwrap(),
        "a failed persist must not touch the seen-store"
    );

    // Next run picks the item up again and persists it
    sink.fail_completely.store(false, Ordering::SeqCst);
    harvester
        .start_single("colombo", RunParams::default())
        .await
        .unwrap();
    harvester.wait_until_idle().await;

    assert_eq!(sink.persisted_ids(), vec!["vid-1"]);
    assert!(harvester.db.is_recently_seen("vid-1", day).await.unwrap());
}

#[tokio::test]
async fn partially_rejected_batches_touch_only_persisted_ids() {
    let source = Arc::new(MockSource::new().with_results(
        "colombo",
        vec![relevant_video("vid-1"), relevant_video("vid-2")],
    ));
    let sink = Arc::new(MockSink::new().rejecting("vid-2"));
    let (harvester, _dir) = harvester_with(source, sink.clone()).await;

    let session_id = harvester
        .start_single("colombo", RunParams::default())
        .await
        .unwrap();
    harvester.wait_until_idle().await;

    let day = Duration::from_secs(24 * 60 * 60);
    assert!(harvester.db.is_recently_seen("vid-1", day).await.unwrap());
    assert!(!harvester.db.is_recently_seen("vid-2", day).await.unwrap());

    let row = harvester
        .db
        .get_session(&session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.error_count, 1, "partial rejection counts as one error");
}

#[tokio::test]
async fn one_failing_strategy_does_not_abort_the_run() {
    let source = Arc::new(
        MockSource::new()
            .failing_query("broken", "fatal")
            .with_results("colombo", vec![relevant_video("vid-1")]),
    );
    let sink = Arc::new(MockSink::new());
    let (harvester, _dir) = harvester_with(source, sink.clone()).await;

    let session_id = harvester
        .start_targeted(vec!["broken".into(), "colombo".into()], 25)
        .await
        .unwrap();
    harvester.wait_until_idle().await;

    let row = harvester
        .db
        .get_session(&session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(SessionStatus::from_i32(row.status), SessionStatus::Completed);
    assert_eq!(row.error_count, 1);
    assert_eq!(row.completed_strategies, 2);
    assert_eq!(sink.persisted_ids(), vec!["vid-1"]);
}

#[tokio::test]
async fn single_mode_strategy_failure_fails_the_session() {
    let source = Arc::new(MockSource::new().failing_query("broken", "fatal"));
    let (harvester, _dir) = harvester_with(source, Arc::new(MockSink::new())).await;

    let session_id = harvester
        .start_single("broken", RunParams::default())
        .await
        .unwrap();
    harvester.wait_until_idle().await;

    let row = harvester
        .db
        .get_session(&session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(SessionStatus::from_i32(row.status), SessionStatus::Failed);
    assert_eq!(row.error_count, 1);
}

#[tokio::test]
async fn quota_wall_on_first_credential_rotates_to_second() {
    let source = Arc::new(
        MockSource::new()
            .with_quota_key("test-key-a")
            .with_results("colombo", vec![relevant_video("vid-1")]),
    );
    let sink = Arc::new(MockSink::new());
    let (harvester, _dir) = harvester_with(source, sink.clone()).await;

    harvester
        .start_single("colombo", RunParams::default())
        .await
        .unwrap();
    harvester.wait_until_idle().await;

    assert_eq!(sink.persisted_ids(), vec!["vid-1"]);

    let pool = harvester.status().await.credentials;
    assert_eq!(pool.credentials[0].quota_exceeded_count, 1);
    assert_eq!(pool.current_index, 1, "pool pointer moved to the viable key");
}

#[tokio::test]
async fn events_trace_the_session_lifecycle() {
    let source = Arc::new(
        MockSource::new().with_results("colombo", vec![relevant_video("vid-1")]),
    );
    let (harvester, _dir) = harvester_with(source, Arc::new(MockSink::new())).await;
    let mut events = harvester.subscribe();

    harvester
        .start_single("colombo", RunParams::default())
        .await
        .unwrap();
    harvester.wait_until_idle().await;

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(event.kind());
    }

    assert_eq!(
        kinds,
        vec![
            "session_started",
            "strategy_started",
            "batch_persisted",
            "strategy_completed",
            "session_completed",
        ]
    );
}

#[tokio::test]
async fn every_logical_request_lands_in_the_usage_log() {
    let source = Arc::new(
        MockSource::new().with_results("colombo", vec![relevant_video("vid-1")]),
    );
    let (harvester, _dir) = harvester_with(source, Arc::new(MockSink::new())).await;

    harvester
        .start_single("colombo", RunParams::default())
        .await
        .unwrap();
    harvester.wait_until_idle().await;

    // One search call + one detail call
    let (total, successful) = harvester.db.usage_last_24h().await.unwrap();
    assert_eq!(total, 2);
    assert_eq!(successful, 2);
}

#[tokio::test]
async fn comprehensive_run_walks_the_configured_catalog() {
    // Catalog queries return nothing; the run still completes cleanly
    let source = Arc::new(MockSource::new());
    let (harvester, _dir) = harvester_with(source.clone(), Arc::new(MockSink::new())).await;

    let session_id = harvester.start_comprehensive().await.unwrap();
    harvester.wait_until_idle().await;

    let row = harvester
        .db
        .get_session(&session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(SessionStatus::from_i32(row.status), SessionStatus::Completed);
    assert_eq!(row.mode, "comprehensive");
    assert_eq!(row.total_strategies, 21);
    assert_eq!(row.completed_strategies, 21);
    assert_eq!(
        source.search_calls.load(Ordering::SeqCst),
        21,
        "one search per catalog strategy"
    );
}
