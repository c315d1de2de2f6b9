//! Application state management

use std::sync::Arc;

use crate::inference::InferenceEngine;

use super::ServerConfig;

/// Application state shared across handlers; immutable after startup
pub struct AppState {
    pub config: ServerConfig,
    pub engine: Arc<InferenceEngine>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: ServerConfig, engine: InferenceEngine) -> Self {
        Self {
            config,
            engine: Arc::new(engine),
            started_at: chrono::Utc::now(),
        }
    }

    pub fn uptime_secs(&self) -> i64 {
        chrono::Utc::now().signed_duration_since(self.started_at).num_seconds()
    }
}
