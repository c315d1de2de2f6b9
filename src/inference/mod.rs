//! Inference engine module
//!
//! Provides model inference for the serving path with:
//! - One-time artifact loading and warmup
//! - Strict 561-feature input validation
//! - Arg-max label, confidence and per-class probabilities
//! - Parallel batch prediction via rayon
//! - Request and latency counters

mod config;
mod engine;
mod prediction;

pub use config::InferenceConfig;
pub use engine::{InferenceEngine, InferenceStats};
pub use prediction::{ClassProbabilities, Prediction};
