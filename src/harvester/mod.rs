//! Core extraction orchestrator split into focused submodules.
//!
//! The `VideoHarvester` struct and its methods are organized by domain:
//! - [`runs`] - Session lifecycle: start/stop/status and the strategy loop
//!
//! The harvester enforces single-flight semantics: at most one extraction
//! session runs at a time, guarded by an async mutex around the run slot.
//! Strategies within a run are processed sequentially to keep credential
//! quota accounting deterministic.

mod runs;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::credentials::CredentialPool;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::scoring::ScoringEngine;
use crate::sink::{DatabaseSink, VideoSink};
use crate::source::{HttpSearchSource, SearchSource};
use crate::types::{Event, RunMode, SessionId, SessionSnapshot, SessionStatus};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

/// Live counters for the active run, shared between the driver task and the
/// status surface.
#[derive(Debug, Default)]
pub(crate) struct RunCounters {
    pub(crate) completed_strategies: AtomicU32,
    pub(crate) items_extracted: AtomicU64,
    pub(crate) relevant_items: AtomicU64,
    pub(crate) error_count: AtomicU64,
}

/// State of the currently running session
pub(crate) struct ActiveRun {
    pub(crate) session_id: SessionId,
    pub(crate) mode: RunMode,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) total_strategies: u32,
    pub(crate) counters: Arc<RunCounters>,
    /// Cancellation token for cooperative stop at strategy boundaries
    pub(crate) cancel: CancellationToken,
    /// Driver task handle, taken by the first waiter
    pub(crate) handle: Option<tokio::task::JoinHandle<()>>,
}

impl ActiveRun {
    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            mode: self.mode,
            status: SessionStatus::Running,
            started_at: self.started_at,
            ended_at: None,
            total_strategies: self.total_strategies,
            completed_strategies: self.counters.completed_strategies.load(Ordering::SeqCst),
            items_extracted: self.counters.items_extracted.load(Ordering::SeqCst),
            relevant_items: self.counters.relevant_items.load(Ordering::SeqCst),
            error_count: self.counters.error_count.load(Ordering::SeqCst),
        }
    }
}

/// The single-flight run slot. Checking and claiming it happens under one
/// lock acquisition, so concurrent start attempts cannot both succeed.
#[derive(Default)]
pub(crate) struct RunSlot {
    pub(crate) active: Option<ActiveRun>,
}

/// Main harvester instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct VideoHarvester {
    /// Database instance for persistence (wrapped in Arc for sharing across tasks)
    /// Public for integration tests to query cache and session state
    pub db: Arc<Database>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Credential pool shared by every outbound call
    pub(crate) credentials: Arc<CredentialPool>,
    /// Compiled scoring engine
    pub(crate) scoring: Arc<ScoringEngine>,
    /// External search source (trait object for pluggable implementations)
    pub(crate) source: Arc<dyn SearchSource>,
    /// Downstream sink for accepted items
    pub(crate) sink: Arc<dyn VideoSink>,
    /// Single-flight run slot
    pub(crate) run_slot: Arc<tokio::sync::Mutex<RunSlot>>,
    /// Flag cleared during shutdown to reject new runs
    pub(crate) accepting_new: Arc<AtomicBool>,
}

impl VideoHarvester {
    /// Create a new harvester with the built-in HTTP source and database sink.
    ///
    /// This initializes all core components:
    /// - Opens/creates the SQLite database and runs migrations
    /// - Builds the credential pool (an empty key list is a fatal error)
    /// - Compiles the scoring engine
    /// - Sets up the event broadcast channel
    pub async fn new(config: Config) -> Result<Self> {
        let db = Arc::new(Database::new(&config.persistence.database_path).await?);
        let source: Arc<dyn SearchSource> = Arc::new(HttpSearchSource::new(&config.source)?);
        let sink: Arc<dyn VideoSink> = Arc::new(DatabaseSink::new(db.clone()));
        Self::with_components(config, db, source, sink)
    }

    /// Create a harvester with caller-supplied source and sink
    /// implementations. Used by embedders with custom adapters and by tests.
    pub fn with_components(
        config: Config,
        db: Arc<Database>,
        source: Arc<dyn SearchSource>,
        sink: Arc<dyn VideoSink>,
    ) -> Result<Self> {
        let credentials = Arc::new(CredentialPool::new(
            &config.credentials.api_keys,
            config.credentials.daily_limit_per_key,
        )?);
        let scoring = Arc::new(ScoringEngine::new(&config.scoring)?);

        // Buffer size 1000: subscribers that fall further behind see Lagged
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        tracing::info!(
            sink = sink.name(),
            strategies = config.strategies.strategies.len(),
            "Harvester initialized"
        );

        Ok(Self {
            db,
            event_tx,
            config: Arc::new(config),
            credentials,
            scoring,
            source,
            sink,
            run_slot: Arc::new(tokio::sync::Mutex::new(RunSlot::default())),
            accepting_new: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Subscribe to harvest events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all
    /// events independently. Events are buffered; a subscriber that falls
    /// behind by more than 1000 events receives a `RecvError::Lagged` error.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Credential pool summary (counts and hashes only, never raw values)
    pub fn credential_status(&self) -> crate::credentials::CredentialPoolStatus {
        self.credentials.status()
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// extraction continues whether or not anyone is listening.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server runs concurrently with extraction and listens on the
    /// configured bind address (default: 127.0.0.1:6780).
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let harvester = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(harvester, config).await })
    }

    /// Graceful shutdown: stop accepting runs, request a cooperative stop of
    /// the active session, wait for it to wind down, then close the database.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Harvester shutting down");
        self.accepting_new.store(false, Ordering::SeqCst);

        match self.stop_run().await {
            Ok(session_id) => {
                tracing::info!(session_id = %session_id, "Requested stop of active session")
            }
            Err(Error::NoActiveRun) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to request session stop"),
        }

        self.wait_until_idle().await;
        self.emit_event(Event::Shutdown);
        self.db.close().await;
        Ok(())
    }
}
