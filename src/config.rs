//! Configuration types for video-harvest

use crate::scoring::keywords;
use crate::strategy::{self, SearchStrategy};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Main configuration for the harvester
///
/// Fields are organized into logical sub-configs:
/// - [`credentials`](CredentialsConfig) — API credential pool
/// - [`source`](SourceConfig) — external search API endpoint and tuning
/// - [`retry`](RetryConfig) — backoff and rotation budgets
/// - [`scoring`](ScoringConfig) — keyword tables, weights, thresholds
/// - [`dedup`](DedupConfig) — freshness-windowed deduplication
/// - [`strategies`](StrategyConfig) — comprehensive strategy catalog and pacing
/// - [`persistence`](PersistenceConfig) — database location
/// - [`scheduler`](SchedulerConfig) — periodic comprehensive runs
/// - [`api`](ApiConfig) — REST server settings
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// API credential pool settings
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// External search source settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Retry and rotation budgets
    #[serde(default)]
    pub retry: RetryConfig,

    /// Scoring keyword tables and thresholds
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Deduplication cache settings
    #[serde(default)]
    pub dedup: DedupConfig,

    /// Search strategy catalog and pacing
    #[serde(default)]
    pub strategies: StrategyConfig,

    /// Data storage settings
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Periodic comprehensive-run scheduling
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

/// API credential pool configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CredentialsConfig {
    /// Ordered list of API keys (at least one required to reach the source)
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// Daily request quota charged per credential (default: 10000)
    #[serde(default = "default_daily_limit")]
    pub daily_limit_per_key: u64,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            daily_limit_per_key: default_daily_limit(),
        }
    }
}

/// External search source configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SourceConfig {
    /// Base URL of the search API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Region code passed to search calls (default: "LK")
    #[serde(default = "default_region_code")]
    pub region_code: String,

    /// Relevance language passed to search calls (default: "en")
    #[serde(default = "default_relevance_language")]
    pub relevance_language: String,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Maximum item ids per detail call - the external API's per-call limit
    /// (default: 50)
    #[serde(default = "default_detail_batch_size")]
    pub detail_batch_size: usize,

    /// Prefix for building canonical watch URLs (item id is appended)
    #[serde(default = "default_watch_url_base")]
    pub watch_url_base: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            region_code: default_region_code(),
            relevance_language: default_relevance_language(),
            request_timeout: default_request_timeout(),
            detail_batch_size: default_detail_batch_size(),
            watch_url_base: default_watch_url_base(),
        }
    }
}

/// Retry configuration for outbound calls
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    /// Maximum total attempts per logical request, shared between backoff
    /// retries and credential rotations (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,

    /// Wall-clock budget for one logical request including all retries
    /// (default: 300 seconds)
    #[serde(default = "default_total_budget", with = "duration_serde")]
    pub total_budget: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
            total_budget: default_total_budget(),
        }
    }
}

/// Scoring engine configuration: keyword tables, weights, thresholds.
///
/// The weights and the relevance threshold are hand-tuned production values
/// carried as configuration; the engine reproduces the formula without
/// inferring anything beyond it.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ScoringConfig {
    /// Relevance score at or above which an item is accepted (default: 0.3)
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f64,

    /// Location keywords (x0.2 each, capped at 0.4)
    #[serde(default = "keywords::locations")]
    pub locations: Vec<String>,

    /// Language/nationality keywords (x0.15 each, capped at 0.3)
    #[serde(default = "keywords::languages")]
    pub languages: Vec<String>,

    /// Cultural terms (x0.10 each, capped at 0.2)
    #[serde(default = "keywords::cultural_terms")]
    pub cultural_terms: Vec<String>,

    /// Institution keywords (x0.05 each, shared 0.1 cap with media outlets)
    #[serde(default = "keywords::institutions")]
    pub institutions: Vec<String>,

    /// Media outlet keywords (x0.05 each, shared 0.1 cap with institutions)
    #[serde(default = "keywords::media_outlets")]
    pub media_outlets: Vec<String>,

    /// Positive quality keywords (+0.1 each, capped at +0.3)
    #[serde(default = "keywords::positive_quality")]
    pub positive_quality: Vec<String>,

    /// Negative quality keywords (-0.1 each, capped at -0.3)
    #[serde(default = "keywords::negative_quality")]
    pub negative_quality: Vec<String>,

    /// Spam detection regex patterns (compiled case-insensitively)
    #[serde(default = "keywords::spam_patterns")]
    pub spam_patterns: Vec<String>,

    /// Channel locale hints that grant the +0.2 region bonus
    #[serde(default = "keywords::region_hints")]
    pub region_hints: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: default_relevance_threshold(),
            locations: keywords::locations(),
            languages: keywords::languages(),
            cultural_terms: keywords::cultural_terms(),
            institutions: keywords::institutions(),
            media_outlets: keywords::media_outlets(),
            positive_quality: keywords::positive_quality(),
            negative_quality: keywords::negative_quality(),
            spam_patterns: keywords::spam_patterns(),
            region_hints: keywords::region_hints(),
        }
    }
}

/// Deduplication cache configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DedupConfig {
    /// Enable the freshness check before scoring (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// How long a seen-record suppresses re-extraction (default: 24 hours)
    #[serde(default = "default_freshness_window", with = "duration_serde")]
    pub freshness_window: Duration,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            freshness_window: default_freshness_window(),
        }
    }
}

/// Search strategy catalog and pacing configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StrategyConfig {
    /// Ordered strategy list for comprehensive runs (default: built-in catalog)
    #[serde(default = "strategy::default_catalog")]
    pub strategies: Vec<SearchStrategy>,

    /// Delay between dispatching consecutive strategies (default: 2 seconds)
    #[serde(default = "default_strategy_delay", with = "duration_serde")]
    pub delay_between: Duration,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            strategies: strategy::default_catalog(),
            delay_between: default_strategy_delay(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// SQLite database path (default: "data/harvest.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Periodic comprehensive-run scheduling
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SchedulerConfig {
    /// Enable the background scheduler (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Interval between comprehensive runs (default: 6 hours)
    #[serde(default = "default_scheduler_interval", with = "duration_serde")]
    pub interval: Duration,

    /// How often the scheduler loop wakes up to check (default: 30 seconds)
    #[serde(default = "default_scheduler_poll", with = "duration_serde")]
    pub poll_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: default_scheduler_interval(),
            poll_interval: default_scheduler_poll(),
        }
    }
}

/// REST API server configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Bind address (default: 127.0.0.1:6780)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Require this key in the X-Api-Key header when set
    #[serde(default)]
    pub api_key: Option<String>,

    /// Enable CORS (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins ("*" = any; default)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Serve interactive Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_key: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

fn default_daily_limit() -> u64 {
    10_000
}

fn default_base_url() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}

fn default_region_code() -> String {
    "LK".to_string()
}

fn default_relevance_language() -> String {
    "en".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_detail_batch_size() -> usize {
    50
}

fn default_watch_url_base() -> String {
    "https://www.youtube.com/watch?v=".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_total_budget() -> Duration {
    Duration::from_secs(300)
}

fn default_relevance_threshold() -> f64 {
    0.3
}

fn default_freshness_window() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_strategy_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/harvest.db")
}

fn default_scheduler_interval() -> Duration {
    Duration::from_secs(6 * 60 * 60)
}

fn default_scheduler_poll() -> Duration {
    Duration::from_secs(30)
}

fn default_bind_address() -> SocketAddr {
    "127.0.0.1:6780".parse().unwrap_or_else(|_| {
        SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST), 6780)
    })
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
