//! Periodic comprehensive-run scheduling
//!
//! The scheduler is the timer that kicks off comprehensive extraction runs.
//! It wakes up on a short poll interval, starts a run when the configured
//! interval has elapsed since the last trigger, and simply skips a tick when
//! a session is already in flight - the harvester's single-flight guard is
//! the source of truth, not the scheduler.
//!
//! # Example
//!
//! ```no_run
//! use video_harvest::{Config, VideoHarvester};
//! use video_harvest::scheduler::HarvestScheduler;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = Config::default();
//! config.credentials.api_keys = vec!["key".to_string()];
//! config.scheduler.enabled = true;
//!
//! let harvester = Arc::new(VideoHarvester::new(config).await?);
//! let scheduler = HarvestScheduler::new(harvester.clone());
//!
//! // Run scheduler (loops until shutdown)
//! tokio::spawn(async move {
//!     scheduler.run().await;
//! });
//! # Ok(())
//! # }
//! ```

use crate::VideoHarvester;
use crate::error::Error;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Background scheduler that periodically starts comprehensive runs
pub struct HarvestScheduler {
    harvester: Arc<VideoHarvester>,
}

impl HarvestScheduler {
    /// Creates a new scheduler bound to a harvester instance.
    pub fn new(harvester: Arc<VideoHarvester>) -> Self {
        Self { harvester }
    }

    /// Run the scheduling loop until the harvester shuts down.
    ///
    /// Each poll tick the scheduler:
    /// 1. Exits if the harvester stopped accepting new runs (shutdown)
    /// 2. Starts a comprehensive run when the interval has elapsed
    /// 3. Skips the tick when a session is already running
    pub async fn run(self) {
        let config = self.harvester.get_config().scheduler.clone();
        if !config.enabled {
            info!("Harvest scheduler disabled, not starting");
            return;
        }

        info!(
            interval_secs = config.interval.as_secs(),
            "Harvest scheduler started"
        );

        let mut last_trigger: Option<Instant> = None;

        loop {
            if !self.harvester.accepting_new.load(Ordering::SeqCst) {
                info!("Harvest scheduler shutting down");
                break;
            }

            let due = last_trigger
                .map(|t| t.elapsed() >= config.interval)
                .unwrap_or(true);

            if due {
                match self.harvester.start_comprehensive().await {
                    Ok(session_id) => {
                        last_trigger = Some(Instant::now());
                        info!(session_id = %session_id, "Scheduled comprehensive run started");
                    }
                    Err(Error::AlreadyRunning) => {
                        debug!("Session already in flight, skipping scheduled run");
                    }
                    Err(Error::ShuttingDown) => {
                        info!("Harvest scheduler shutting down");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to start scheduled run");
                    }
                }
            }

            tokio::time::sleep(config.poll_interval).await;
        }
    }
}
