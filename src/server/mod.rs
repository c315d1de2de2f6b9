//! HAR inference server
//!
//! HTTP service around a single pretrained classifier loaded at startup.
//! Exposes `/predict`, `/notify` and `/health`.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use handlers::PredictRequest;
pub use state::AppState;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use crate::inference::{InferenceConfig, InferenceEngine};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Serving directory or quantized artifact
    pub model_path: PathBuf,
    /// Browser origins allowed by CORS
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub inference: InferenceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            model_path: std::env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models/har_gru_savedmodel")),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| parse_origins(&s))
                .unwrap_or_else(|_| {
                    vec![
                        "http://localhost:8100".to_string(),
                        "http://127.0.0.1:8100".to_string(),
                    ]
                }),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            inference: InferenceConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn with_address(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }
}

/// Comma-separated origin list; blanks are dropped
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Load the model, then serve until ctrl+c. Load failure aborts before binding.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    info!(model_path = %config.model_path.display(), "Loading model");

    let engine = InferenceEngine::load(&config.model_path, config.inference.clone())
        .with_context(|| format!("failed to load model from {}", config.model_path.display()))?;

    let state = Arc::new(AppState::new(config.clone(), engine));
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        host = %config.host,
        port = config.port,
        address = %addr,
        cors_origins = ?config.cors_origins,
        request_timeout_secs = config.request_timeout_secs,
        started_at = %start_time.to_rfc3339(),
        "HAR inference server starting"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening and ready to accept connections");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install ctrl+c handler");
            std::future::pending::<()>().await;
        }
        let stop_time = chrono::Utc::now();
        let uptime = stop_time.signed_duration_since(start_time);
        info!(
            stopped_at = %stop_time.to_rfc3339(),
            uptime_secs = uptime.num_seconds(),
            "Shutdown signal received, stopping server gracefully"
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("http://a.test, http://b.test ,,"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn test_builders() {
        let config = ServerConfig::default()
            .with_model_path("/tmp/model.hq8")
            .with_address("127.0.0.1", 9000);
        assert_eq!(config.model_path, PathBuf::from("/tmp/model.hq8"));
        assert_eq!(config.port, 9000);
        assert!(config.request_timeout_secs > 0);
    }

    #[tokio::test]
    async fn test_missing_model_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::default()
            .with_model_path(dir.path().join("absent"))
            .with_address("127.0.0.1", 0);
        assert!(run_server(config).await.is_err());
    }
}
