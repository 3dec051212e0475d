//! Shared application state for the API server.

use std::sync::Arc;
use std::time::Instant;

use courtside_core::config::CourtsideConfig;
use courtside_core::store::DataSource;
use courtside_flows::FlowOrchestrator;

use crate::rate_limit::RateLimiter;

/// Shared state passed to all route handlers via axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<CourtsideConfig>,
    pub orchestrator: Arc<FlowOrchestrator>,
    /// Same source the tools read from.
    pub data_source: Arc<dyn DataSource>,
    pub limiter: RateLimiter,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: CourtsideConfig, orchestrator: FlowOrchestrator) -> Self {
        let data_source = orchestrator.tools().data_source().clone();
        let limiter = RateLimiter::new(config.general.rate_limit_per_sec);
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            data_source,
            limiter,
            start_time: Instant::now(),
        }
    }
}
