//! # video-harvest
//!
//! Highly configurable backend library for harvesting video metadata from a
//! rate-limited, quota-metered external search API.
//!
//! ## Design Philosophy
//!
//! video-harvest is designed to be:
//! - **Highly configurable** - Almost every behavior can be customized
//! - **Sensible defaults** - Works out of the box with credentials configured
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! The core loop: a strategy schedule feeds the orchestrator, which fetches
//! candidate items through a credential-rotating resilient call executor,
//! drops items the deduplication cache has seen recently, scores the rest for
//! topical relevance and quality, and forwards accepted items to a pluggable
//! sink.
//!
//! ## Quick Start
//!
//! ```no_run
//! use video_harvest::{Config, VideoHarvester};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.credentials.api_keys = vec![
//!         "first-api-key".to_string(),
//!         "second-api-key".to_string(),
//!     ];
//!
//!     let harvester = VideoHarvester::new(config).await?;
//!
//!     // Subscribe to events
//!     let mut events = harvester.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     // Run one comprehensive pass over the strategy catalog
//!     harvester.start_comprehensive().await?;
//!     harvester.wait_until_idle().await;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Credential pool management
pub mod credentials;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Core extraction orchestrator (decomposed into focused submodules)
pub mod harvester;
/// Resilient call execution with retry, backoff and credential rotation
pub mod retry;
/// Periodic comprehensive-run scheduling
pub mod scheduler;
/// Relevance, quality, engagement and spam scoring
pub mod scoring;
/// Downstream persistence interface
pub mod sink;
/// External search source interface
pub mod source;
/// Search strategy scheduling
pub mod strategy;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use credentials::{CredentialPool, CredentialPoolStatus};
pub use db::Database;
pub use error::{ApiError, DatabaseError, Error, ErrorDetail, Result, SourceError, ToHttpStatus};
pub use harvester::VideoHarvester;
pub use scheduler::HarvestScheduler;
pub use scoring::ScoringEngine;
pub use sink::{DatabaseSink, PersistReport, VideoSink};
pub use source::{HttpSearchSource, SearchOptions, SearchSource};
pub use strategy::{SearchStrategy, StrategySchedule};
pub use types::{
    Event, HarvestStatus, RunMode, RunParams, ScoredVideo, SessionId, SessionSnapshot,
    SessionStatus, VideoDetails, VideoRef,
};

/// Helper function to run the harvester with graceful signal handling.
///
/// Waits for a termination signal and then calls the harvester's
/// `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use video_harvest::{Config, VideoHarvester, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut config = Config::default();
///     config.credentials.api_keys = vec!["api-key".to_string()];
///     let harvester = VideoHarvester::new(config).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(harvester).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(harvester: VideoHarvester) -> Result<()> {
    wait_for_signal().await;
    harvester.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
