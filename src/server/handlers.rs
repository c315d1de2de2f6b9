//! Request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::inference::Prediction;
use crate::notify::{notify as pick_notification, NotifyPayload, NotifyResponse};

use super::error::{Result, ServerError};
use super::state::AppState;

// ============================================================================
// Inference
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct PredictRequest {
    /// 561 feature values
    pub features: Vec<f32>,
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<Prediction>> {
    let Json(request) = payload?;
    let engine = Arc::clone(&state.engine);

    let prediction = tokio::task::spawn_blocking(move || engine.predict(&request.features))
        .await
        .map_err(|e| ServerError::Internal(format!("prediction task failed: {}", e)))??;

    debug!(label = %prediction.label, confidence = prediction.confidence, "Served prediction");
    Ok(Json(prediction))
}

// ============================================================================
// Notifications
// ============================================================================

pub async fn notify(
    payload: std::result::Result<Json<NotifyPayload>, JsonRejection>,
) -> Result<Json<NotifyResponse>> {
    let Json(payload) = payload?;
    let steps = payload.steps_delta();
    let response = pick_notification(&payload);
    info!(
        event = payload.event.as_deref().unwrap_or("-"),
        steps_delta = steps,
        title = response.notifications.first().map(|n| n.title.as_str()).unwrap_or("-"),
        "Notification selected"
    );
    Ok(Json(response))
}

// ============================================================================
// System
// ============================================================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.uptime_secs(),
        "model": {
            "signature": state.engine.signature(),
            "metadata": state.engine.metadata(),
        },
        "stats": state.engine.stats(),
    }))
}
