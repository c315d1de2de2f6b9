//! har-gru - Human activity recognition with a GRU classifier
//!
//! This crate covers the whole path from raw sensor features to a served model:
//! - Z-score preprocessing of the 561-feature activity dataset
//! - A recurrent (GRU) classifier trained natively on ndarray
//! - Export to a checksummed serving artifact and an int8 quantized file
//! - An HTTP service answering `/predict` and `/notify`
//!
//! # Modules
//!
//! - [`activity`] - The six activity classes and their fixed order
//! - [`preprocessing`] - Dataset loading, normalization, persistence
//! - [`model`] - GRU network definition
//! - [`training`] - Mini-batch training with Adam
//! - [`export`] - Serving signature and artifact containers
//! - [`inference`] - Validated single and batch prediction
//! - [`notify`] - Step-count notification rule
//! - [`server`] - HTTP server with REST API
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod activity;

// Pipeline
pub mod preprocessing;
pub mod model;
pub mod training;
pub mod export;
pub mod inference;

// Services
pub mod notify;
pub mod server;
pub mod cli;

pub use error::{HarError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::activity::{Activity, NUM_CLASSES, NUM_FEATURES};
    pub use crate::error::{HarError, Result};
    pub use crate::export::{load_artifact, ExportConfig, Exporter, ServingSignature};
    pub use crate::inference::{InferenceConfig, InferenceEngine, Prediction};
    pub use crate::model::{HarNetwork, ModelConfig};
    pub use crate::notify::{notify, NotifyPayload, NotifyResponse};
    pub use crate::preprocessing::{PreprocessingConfig, Preprocessor, ProcessedData};
    pub use crate::training::{TrainedModel, Trainer, TrainingConfig};
}
