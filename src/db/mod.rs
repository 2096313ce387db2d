//! Database layer for video-harvest
//!
//! Handles SQLite persistence for the deduplication seen-store, harvested
//! video cache, extraction sessions and the request usage log.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`seen`] — Freshness-windowed deduplication store
//! - [`sessions`] — Extraction session CRUD and typed transitions
//! - [`videos`] — Harvested video cache and statistics
//! - [`usage`] — Per-attempt request outcome log

use crate::types::{RunMode, SessionId, SessionSnapshot, SessionStatus};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, sqlite::SqlitePool};
use utoipa::ToSchema;

mod migrations;
mod seen;
mod sessions;
mod usage;
mod videos;

pub use sessions::SessionProgress;

/// Extraction session record from database
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    /// Unique database ID
    pub id: i64,
    /// Session identifier
    pub session_id: String,
    /// Run mode label ("single", "comprehensive", "targeted")
    pub mode: String,
    /// Session status code (see [`SessionStatus`])
    pub status: i32,
    /// Unix timestamp when the session started
    pub started_at: i64,
    /// Unix timestamp when the session reached a terminal state
    pub ended_at: Option<i64>,
    /// Number of strategies this session drives
    pub total_strategies: i64,
    /// Strategies completed so far
    pub completed_strategies: i64,
    /// Items fetched and scored so far
    pub items_extracted: i64,
    /// Items accepted as relevant so far
    pub relevant_items: i64,
    /// Strategy-level errors recorded so far
    pub error_count: i64,
    /// JSON copy of the triggering configuration
    pub configuration: Option<String>,
}

impl From<SessionRow> for SessionSnapshot {
    fn from(row: SessionRow) -> Self {
        let mode = match row.mode.as_str() {
            "single" => RunMode::Single,
            "targeted" => RunMode::Targeted,
            _ => RunMode::Comprehensive,
        };

        SessionSnapshot {
            session_id: SessionId::from(row.session_id),
            mode,
            status: SessionStatus::from_i32(row.status),
            started_at: timestamp(row.started_at),
            ended_at: row.ended_at.map(timestamp),
            total_strategies: row.total_strategies.max(0) as u32,
            completed_strategies: row.completed_strategies.max(0) as u32,
            items_extracted: row.items_extracted.max(0) as u64,
            relevant_items: row.relevant_items.max(0) as u64,
            error_count: row.error_count.max(0) as u64,
        }
    }
}

/// Harvested video record from database (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub struct CachedVideoRow {
    /// Item identifier
    pub video_id: String,
    /// Item title
    pub title: String,
    /// Item description
    pub description: Option<String>,
    /// Publishing channel identifier
    pub channel_id: String,
    /// Publishing channel display name
    pub channel_title: Option<String>,
    /// RFC3339 publication timestamp
    pub published_at: Option<String>,
    /// View count
    pub view_count: i64,
    /// Like count
    pub like_count: i64,
    /// Comment count
    pub comment_count: i64,
    /// Raw ISO-8601 duration
    pub duration: Option<String>,
    /// JSON array of tags
    pub tags: Option<String>,
    /// Content category from analysis
    pub category: Option<String>,
    /// Detected content language
    pub detected_language: Option<String>,
    /// Relevance score
    pub relevance_score: f64,
    /// Quality score
    pub quality_score: f64,
    /// Engagement score
    pub engagement_score: f64,
    /// Spam score
    pub spam_score: f64,
    /// Composite score
    pub composite_score: f64,
    /// Relevance classification (0/1)
    pub is_relevant: i64,
    /// The query that surfaced this item
    pub search_query: Option<String>,
    /// Canonical watch URL
    pub video_url: Option<String>,
    /// Unix timestamp when the item was scored
    pub extracted_at: i64,
}

/// Harvested video as exposed by the query surface
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CachedVideo {
    /// Item identifier
    pub video_id: String,
    /// Item title
    pub title: String,
    /// Item description
    pub description: String,
    /// Publishing channel identifier
    pub channel_id: String,
    /// Publishing channel display name
    pub channel_title: String,
    /// Publication timestamp
    pub published_at: Option<DateTime<Utc>>,
    /// View count
    pub view_count: u64,
    /// Like count
    pub like_count: u64,
    /// Comment count
    pub comment_count: u64,
    /// Raw ISO-8601 duration
    pub duration: String,
    /// Uploader tags
    pub tags: Vec<String>,
    /// Content category from analysis
    pub category: String,
    /// Detected content language
    pub detected_language: String,
    /// Relevance score
    pub relevance_score: f64,
    /// Quality score
    pub quality_score: f64,
    /// Engagement score
    pub engagement_score: f64,
    /// Spam score
    pub spam_score: f64,
    /// Composite score
    pub composite_score: f64,
    /// Relevance classification
    pub is_relevant: bool,
    /// The query that surfaced this item
    pub search_query: String,
    /// Canonical watch URL
    pub video_url: String,
    /// When the item was scored
    pub extracted_at: DateTime<Utc>,
}

impl From<CachedVideoRow> for CachedVideo {
    fn from(row: CachedVideoRow) -> Self {
        let tags = row
            .tags
            .as_deref()
            .and_then(|t| serde_json::from_str(t).ok())
            .unwrap_or_default();

        CachedVideo {
            video_id: row.video_id,
            title: row.title,
            description: row.description.unwrap_or_default(),
            channel_id: row.channel_id,
            channel_title: row.channel_title.unwrap_or_default(),
            published_at: row
                .published_at
                .as_deref()
                .and_then(|p| DateTime::parse_from_rfc3339(p).ok())
                .map(|p| p.with_timezone(&Utc)),
            view_count: row.view_count.max(0) as u64,
            like_count: row.like_count.max(0) as u64,
            comment_count: row.comment_count.max(0) as u64,
            duration: row.duration.unwrap_or_default(),
            tags,
            category: row.category.unwrap_or_default(),
            detected_language: row.detected_language.unwrap_or_default(),
            relevance_score: row.relevance_score,
            quality_score: row.quality_score,
            engagement_score: row.engagement_score,
            spam_score: row.spam_score,
            composite_score: row.composite_score,
            is_relevant: row.is_relevant != 0,
            search_query: row.search_query.unwrap_or_default(),
            video_url: row.video_url.unwrap_or_default(),
            extracted_at: timestamp(row.extracted_at),
        }
    }
}

/// Channel aggregate from the analytics surface
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct ChannelAggregate {
    /// Channel identifier
    pub channel_id: String,
    /// Channel display name
    pub channel_title: Option<String>,
    /// Number of cached videos from this channel
    pub video_count: i64,
    /// Sum of view counts
    pub total_views: i64,
    /// Mean composite score
    pub avg_composite_score: f64,
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}

/// Database handle for video-harvest
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod tests;
