//! Core types for video-harvest

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Unique identifier for an extraction session
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a fresh random session identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Extraction session status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Session is actively processing strategies
    Running,
    /// Session finished all strategies
    Completed,
    /// Session aborted with an unrecoverable error
    Failed,
    /// Session stopped by user request
    Stopped,
}

impl SessionStatus {
    /// Convert integer status code to SessionStatus enum
    pub fn from_i32(status: i32) -> Self {
        match status {
            0 => SessionStatus::Running,
            1 => SessionStatus::Completed,
            2 => SessionStatus::Failed,
            3 => SessionStatus::Stopped,
            _ => SessionStatus::Failed,
        }
    }

    /// Convert SessionStatus enum to integer for database storage
    pub fn to_i32(self) -> i32 {
        match self {
            SessionStatus::Running => 0,
            SessionStatus::Completed => 1,
            SessionStatus::Failed => 2,
            SessionStatus::Stopped => 3,
        }
    }

    /// Terminal states never transition again
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::Running)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::Stopped => "stopped",
        };
        write!(f, "{}", s)
    }
}

/// How an extraction run was triggered and which strategies it drives
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// One caller-supplied query
    Single,
    /// The full configured strategy catalog
    Comprehensive,
    /// A caller-supplied ad hoc query list
    Targeted,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunMode::Single => "single",
            RunMode::Comprehensive => "comprehensive",
            RunMode::Targeted => "targeted",
        };
        write!(f, "{}", s)
    }
}

/// Caller-tunable parameters for a single-query run
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RunParams {
    /// Maximum number of results to request (default: 50)
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// Result ordering requested from the source (default: "relevance")
    #[serde(default = "default_order")]
    pub order: String,

    /// Only include items published after this instant
    #[serde(default)]
    pub published_after: Option<DateTime<Utc>>,

    /// Only include items published before this instant
    #[serde(default)]
    pub published_before: Option<DateTime<Utc>>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            order: default_order(),
            published_after: None,
            published_before: None,
        }
    }
}

/// Lightweight reference to a video returned by a search call.
///
/// Details (statistics, duration, flags) are fetched separately via the
/// batched detail call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VideoRef {
    /// Opaque item identifier
    pub video_id: String,
    /// Item title from the search snippet
    pub title: String,
    /// Publishing channel identifier
    pub channel_id: String,
}

/// Full metadata for a single video, as returned by the detail call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VideoDetails {
    /// Opaque item identifier
    pub video_id: String,
    /// Item title
    pub title: String,
    /// Item description
    #[serde(default)]
    pub description: String,
    /// Publication timestamp
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Publishing channel identifier
    pub channel_id: String,
    /// Publishing channel display name
    #[serde(default)]
    pub channel_title: String,
    /// Channel locale hint, when the source exposes one (e.g. "LK")
    #[serde(default)]
    pub channel_country: Option<String>,
    /// Free-form tags attached by the uploader
    #[serde(default)]
    pub tags: Vec<String>,
    /// Source-specific category identifier
    #[serde(default)]
    pub category_id: Option<String>,
    /// Declared content language, when present
    #[serde(default)]
    pub default_language: Option<String>,
    /// View count
    #[serde(default)]
    pub view_count: u64,
    /// Like count
    #[serde(default)]
    pub like_count: u64,
    /// Comment count
    #[serde(default)]
    pub comment_count: u64,
    /// Raw ISO-8601 duration string (e.g. "PT10M30S")
    #[serde(default)]
    pub duration: String,
    /// High-definition flag
    #[serde(default)]
    pub hd: bool,
    /// Captions-available flag
    #[serde(default)]
    pub captions: bool,
}

/// Analysis metadata attached to a scored video
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContentAnalysis {
    /// Location keywords that matched the text corpus
    pub matched_locations: Vec<String>,
    /// Cultural terms that matched the text corpus
    pub matched_cultural_terms: Vec<String>,
    /// Heuristically detected content language
    pub detected_language: String,
    /// Keyword-bucket content category
    pub content_category: String,
}

/// A video with its computed scores and classification.
///
/// Computed once per item per extraction pass; re-extraction recomputes from
/// scratch rather than mutating an existing value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScoredVideo {
    /// The raw item the scores were computed from
    #[serde(flatten)]
    pub details: VideoDetails,

    /// Topical relevance score in [0, 1]
    pub relevance_score: f64,
    /// Content quality score in [0, 1]
    pub quality_score: f64,
    /// Audience engagement score in [0, 1]
    pub engagement_score: f64,
    /// Spam likelihood score in [0, 1]
    pub spam_score: f64,
    /// Weighted composite score in [0, 1], rounded to 3 decimals
    pub composite_score: f64,
    /// True when the relevance score clears the configured threshold
    pub is_relevant: bool,

    /// Analysis metadata (matched terms, detected language, category)
    pub analysis: ContentAnalysis,

    /// The query that surfaced this item
    pub search_query: String,
    /// Canonical watch URL for the item
    pub video_url: String,
    /// When this item was scored
    pub extracted_at: DateTime<Utc>,
}

/// Point-in-time snapshot of an extraction session
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionSnapshot {
    /// Session identifier
    pub session_id: SessionId,
    /// How the session was triggered
    pub mode: RunMode,
    /// Current session status
    pub status: SessionStatus,
    /// When the session started
    pub started_at: DateTime<Utc>,
    /// When the session reached a terminal state, if it has
    pub ended_at: Option<DateTime<Utc>>,
    /// Number of strategies this session will drive
    pub total_strategies: u32,
    /// Number of strategies completed so far
    pub completed_strategies: u32,
    /// Items fetched and scored so far
    pub items_extracted: u64,
    /// Items accepted as relevant so far
    pub relevant_items: u64,
    /// Strategy-level errors recorded so far
    pub error_count: u64,
}

/// Aggregate statistics over the local video cache
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CacheStats {
    /// Total cached videos
    pub total_videos: u64,
    /// Cached videos classified as relevant
    pub relevant_videos: u64,
    /// Distinct channels seen
    pub unique_channels: u64,
    /// Entries in the deduplication seen-store
    pub seen_records: u64,
    /// Videos cached in the last 24 hours
    pub recent_videos_24h: u64,
    /// Mean composite score over the cache
    pub avg_composite_score: f64,
}

/// Orchestrator state exposed by the status surface
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RunnerState {
    /// No session in flight
    Idle,
    /// A session is currently running
    Running,
}

/// Read-only status snapshot combining runner state, session data and
/// credential-pool summary. Returned by the status surface; building it
/// never fails.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HarvestStatus {
    /// Whether a session is in flight
    pub state: RunnerState,
    /// Snapshot of the active session, when one is running
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionSnapshot>,
    /// Snapshot of the most recently finished session, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_session: Option<SessionSnapshot>,
    /// Credential pool summary (counts only, never raw credential values)
    pub credentials: crate::credentials::CredentialPoolStatus,
    /// Local cache statistics (best effort; zeroed when unavailable)
    pub cache: CacheStats,
    /// When this snapshot was taken
    pub snapshot_at: DateTime<Utc>,
}

/// Events emitted by the harvester during extraction runs
///
/// Events are broadcast to all subscribers; see
/// [`crate::VideoHarvester::subscribe`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// An extraction session started
    SessionStarted {
        /// Session identifier
        session_id: SessionId,
        /// How the session was triggered
        mode: RunMode,
        /// Number of strategies the session will drive
        total_strategies: u32,
    },

    /// A strategy began processing
    StrategyStarted {
        /// Session identifier
        session_id: SessionId,
        /// Strategy query text
        query: String,
        /// Zero-based strategy index within the run
        index: u32,
    },

    /// A strategy finished processing
    StrategyCompleted {
        /// Session identifier
        session_id: SessionId,
        /// Strategy query text
        query: String,
        /// Items fetched and scored for this strategy
        items_extracted: u64,
        /// Items accepted as relevant for this strategy
        relevant_items: u64,
    },

    /// A strategy failed; the run continues with the next one
    StrategyFailed {
        /// Session identifier
        session_id: SessionId,
        /// Strategy query text
        query: String,
        /// Failure description
        error: String,
    },

    /// A batch of accepted items was handed to the sink
    BatchPersisted {
        /// Session identifier
        session_id: SessionId,
        /// Number of items the sink confirmed
        persisted: u64,
        /// Number of items the sink rejected
        errors: u64,
    },

    /// The session completed all strategies
    SessionCompleted {
        /// Session identifier
        session_id: SessionId,
        /// Total items fetched and scored
        items_extracted: u64,
        /// Total items accepted as relevant
        relevant_items: u64,
        /// Strategy-level errors recorded
        error_count: u64,
    },

    /// The session aborted with an unrecoverable error
    SessionFailed {
        /// Session identifier
        session_id: SessionId,
        /// Failure description
        error: String,
    },

    /// The session stopped at a strategy boundary by user request
    SessionStopped {
        /// Session identifier
        session_id: SessionId,
    },

    /// The harvester is shutting down
    Shutdown,
}

impl Event {
    /// Stable event-type label for SSE streams and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Event::SessionStarted { .. } => "session_started",
            Event::StrategyStarted { .. } => "strategy_started",
            Event::StrategyCompleted { .. } => "strategy_completed",
            Event::StrategyFailed { .. } => "strategy_failed",
            Event::BatchPersisted { .. } => "batch_persisted",
            Event::SessionCompleted { .. } => "session_completed",
            Event::SessionFailed { .. } => "session_failed",
            Event::SessionStopped { .. } => "session_stopped",
            Event::Shutdown => "shutdown",
        }
    }
}

fn default_max_results() -> u32 {
    50
}

fn default_order() -> String {
    "relevance".to_string()
}
