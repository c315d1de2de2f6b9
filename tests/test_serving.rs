//! Integration test: End-to-end model serving flow
//! Tests: export → load artifact (both containers) → predict over HTTP

use har_gru::activity::NUM_FEATURES;
use har_gru::error::HarError;
use har_gru::export::{ExportConfig, Exporter, QUANTIZED_FILE, SERVING_DIR, WEIGHTS_FILE};
use har_gru::inference::{InferenceConfig, InferenceEngine};
use har_gru::model::{HarNetwork, ModelConfig};
use har_gru::server::{create_router, AppState, ServerConfig};
use har_gru::training::{TrainedModel, TrainingConfig, TrainingHistory};
use std::path::Path;
use std::sync::Arc;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

fn export_model(dir: &Path) -> HarNetwork {
    let config = ModelConfig::new().with_gru_units(vec![12]).with_dense_units(vec![12]).with_seed(7);
    let network = HarNetwork::new(config).unwrap();
    let checkpoint = TrainedModel::new(network.clone(), TrainingConfig::default(), TrainingHistory::default());
    Exporter::new(ExportConfig::new(dir)).export(&checkpoint).unwrap();
    network
}

fn app_for(path: &Path) -> axum::Router {
    let config = ServerConfig::default().with_model_path(path);
    let engine = InferenceEngine::load(path, InferenceConfig::default()).unwrap();
    create_router(Arc::new(AppState::new(config, engine)))
}

fn sample(seed: usize) -> Vec<f32> {
    (0..NUM_FEATURES).map(|i| (((i * 31 + seed) % 23) as f32 - 11.0) / 11.0).collect()
}

async fn predict(app: axum::Router, features: &[f32]) -> Value {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "features": features }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 64).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// Serving directory
// ============================================================================

#[tokio::test]
async fn test_serving_dir_predictions_match_network() {
    let dir = tempfile::tempdir().unwrap();
    let network = export_model(dir.path());
    let serving = dir.path().join(SERVING_DIR);

    let engine = InferenceEngine::from_network(network, InferenceConfig::default()).unwrap();
    for seed in 0..5 {
        let x = sample(seed);
        let expected = engine.predict(&x).unwrap();
        let json = predict(app_for(&serving), &x).await;
        assert_eq!(json["label"], expected.label.name());
        let confidence = json["confidence"].as_f64().unwrap() as f32;
        assert!((confidence - expected.confidence).abs() < 1e-6);
    }
}

// ============================================================================
// Quantized artifact
// ============================================================================

#[tokio::test]
async fn test_quantized_artifact_serves_close_predictions() {
    let dir = tempfile::tempdir().unwrap();
    export_model(dir.path());

    let full = InferenceEngine::load(dir.path().join(SERVING_DIR), InferenceConfig::default()).unwrap();
    let quantized_path = dir.path().join(QUANTIZED_FILE);
    let quantized = InferenceEngine::load(&quantized_path, InferenceConfig::default()).unwrap();

    for seed in 0..5 {
        let x = sample(seed);
        let a = full.predict(&x).unwrap();
        let b = quantized.predict(&x).unwrap();
        for (p, q) in a.probabilities.as_slice().iter().zip(b.probabilities.as_slice()) {
            assert!((p - q).abs() < 0.05, "{} vs {}", p, q);
        }
    }

    let json = predict(app_for(&quantized_path), &sample(1)).await;
    assert_eq!(json["probabilities"].as_object().unwrap().len(), 6);
}

// ============================================================================
// Load failures
// ============================================================================

#[test]
fn test_corrupted_weights_fail_to_load() {
    let dir = tempfile::tempdir().unwrap();
    export_model(dir.path());
    let weights = dir.path().join(SERVING_DIR).join(WEIGHTS_FILE);

    let mut bytes = std::fs::read(&weights).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] = bytes[mid].wrapping_add(1);
    std::fs::write(&weights, bytes).unwrap();

    let err = InferenceEngine::load(dir.path().join(SERVING_DIR), InferenceConfig::default()).unwrap_err();
    assert!(matches!(err, HarError::ModelLoadFailure(_)), "{:?}", err);
}

#[test]
fn test_truncated_quantized_file_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    export_model(dir.path());
    let path = dir.path().join(QUANTIZED_FILE);
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() / 3]).unwrap();

    assert!(matches!(
        InferenceEngine::load(&path, InferenceConfig::default()),
        Err(HarError::ModelLoadFailure(_))
    ));
}

#[tokio::test]
async fn test_server_refuses_to_start_without_model() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig::default()
        .with_address("127.0.0.1", 0)
        .with_model_path(dir.path().join(SERVING_DIR));
    assert!(har_gru::server::run_server(config).await.is_err());
}
