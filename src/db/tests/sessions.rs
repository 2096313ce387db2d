//! Extraction session persistence tests.

use super::test_db;
use crate::db::SessionProgress;
use crate::types::{RunMode, SessionId, SessionStatus};

#[tokio::test]
async fn insert_and_fetch_a_running_session() {
    let (db, _dir) = test_db().await;
    let id = SessionId::generate();

    db.insert_session(
        &id,
        RunMode::Comprehensive,
        21,
        Some(&serde_json::json!({"max_results": 50})),
    )
    .await
    .unwrap();

    let row = db.get_session(&id).await.unwrap().expect("session exists");
    assert_eq!(row.session_id, id.as_str());
    assert_eq!(row.mode, "comprehensive");
    assert_eq!(SessionStatus::from_i32(row.status), SessionStatus::Running);
    assert_eq!(row.total_strategies, 21);
    assert!(row.ended_at.is_none());
    assert!(row.configuration.unwrap().contains("max_results"));
}

#[tokio::test]
async fn progress_updates_accumulate() {
    let (db, _dir) = test_db().await;
    let id = SessionId::generate();
    db.insert_session(&id, RunMode::Single, 1, None).await.unwrap();

    db.update_session_progress(
        &id,
        SessionProgress {
            completed_strategies: 1,
            items_extracted: 40,
            relevant_items: 12,
            error_count: 1,
        },
    )
    .await
    .unwrap();

    let row = db.get_session(&id).await.unwrap().unwrap();
    assert_eq!(row.completed_strategies, 1);
    assert_eq!(row.items_extracted, 40);
    assert_eq!(row.relevant_items, 12);
    assert_eq!(row.error_count, 1);
}

#[tokio::test]
async fn completed_sessions_get_an_end_time_and_final_counters() {
    let (db, _dir) = test_db().await;
    let id = SessionId::generate();
    db.insert_session(&id, RunMode::Targeted, 3, None).await.unwrap();

    db.mark_session_completed(
        &id,
        SessionProgress {
            completed_strategies: 3,
            items_extracted: 90,
            relevant_items: 30,
            error_count: 0,
        },
    )
    .await
    .unwrap();

    let row = db.get_session(&id).await.unwrap().unwrap();
    assert_eq!(SessionStatus::from_i32(row.status), SessionStatus::Completed);
    assert!(row.ended_at.is_some());
    assert_eq!(row.items_extracted, 90);
}

#[tokio::test]
async fn terminal_sessions_are_immutable() {
    let (db, _dir) = test_db().await;
    let id = SessionId::generate();
    db.insert_session(&id, RunMode::Single, 1, None).await.unwrap();

    db.mark_session_stopped(&id).await.unwrap();

    // A late failure transition must not overwrite the terminal state
    db.mark_session_failed(&id).await.unwrap();

    let row = db.get_session(&id).await.unwrap().unwrap();
    assert_eq!(SessionStatus::from_i32(row.status), SessionStatus::Stopped);
}

#[tokio::test]
async fn latest_session_returns_most_recent() {
    let (db, _dir) = test_db().await;

    let first = SessionId::generate();
    let second = SessionId::generate();
    db.insert_session(&first, RunMode::Single, 1, None).await.unwrap();
    db.insert_session(&second, RunMode::Comprehensive, 21, None)
        .await
        .unwrap();

    let latest = db.latest_session().await.unwrap().unwrap();
    assert_eq!(latest.session_id, second.as_str());
}

#[tokio::test]
async fn session_row_converts_to_snapshot() {
    let (db, _dir) = test_db().await;
    let id = SessionId::generate();
    db.insert_session(&id, RunMode::Targeted, 5, None).await.unwrap();

    let snapshot: crate::types::SessionSnapshot =
        db.get_session(&id).await.unwrap().unwrap().into();

    assert_eq!(snapshot.session_id, id);
    assert_eq!(snapshot.mode, RunMode::Targeted);
    assert_eq!(snapshot.status, SessionStatus::Running);
    assert_eq!(snapshot.total_strategies, 5);
    assert!(snapshot.ended_at.is_none());
}

#[tokio::test]
async fn duplicate_session_ids_are_rejected() {
    let (db, _dir) = test_db().await;
    let id = SessionId::generate();

    db.insert_session(&id, RunMode::Single, 1, None).await.unwrap();
    let err = db.insert_session(&id, RunMode::Single, 1, None).await;
    assert!(err.is_err(), "session_id carries a UNIQUE constraint");
}
