//! Data preprocessing module
//!
//! Turns the raw text tables of the activity dataset into normalized,
//! persisted arrays:
//! - Raw split loading with 1-based → 0-based label shift
//! - Z-score normalization fitted on the training split only
//! - Fixed-name persistence of the four processed arrays

mod config;
mod loader;
mod pipeline;
mod scaler;
mod store;

pub use config::PreprocessingConfig;
pub use loader::{load_split, read_feature_table, read_label_column, Split};
pub use pipeline::Preprocessor;
pub use scaler::{StandardScaler, DEFAULT_EPSILON};
pub use store::{
    to_sequences, ProcessedData, SCALER_FILE, X_TEST_FILE, X_TRAIN_FILE, Y_TEST_FILE, Y_TRAIN_FILE,
};
