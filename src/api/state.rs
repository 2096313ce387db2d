//! Application state for the API server

use crate::{Config, VideoHarvester};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone) and provides
/// access to the harvester instance and configuration.
#[derive(Clone)]
pub struct AppState {
    /// The main VideoHarvester instance
    pub harvester: Arc<VideoHarvester>,

    /// Configuration (read access)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(harvester: Arc<VideoHarvester>, config: Arc<Config>) -> Self {
        Self { harvester, config }
    }
}
