//! Model export
//!
//! Turns a trained checkpoint into servable artifacts sharing one named
//! signature (`input: (batch, 1, 561)` → `output: (batch, 6)`):
//! - Serving directory with JSON signature/metadata and checksummed weights
//! - Single-file int8 quantized artifact

mod artifact;
mod exporter;
mod metadata;
mod quantize;
mod signature;

pub use artifact::{
    load_artifact, save_quantized, save_serving_dir, LoadedArtifact, FORMAT_VERSION, METADATA_FILE,
    QUANTIZED_FILE, SERVING_DIR, SIGNATURE_FILE, WEIGHTS_FILE,
};
pub use exporter::{sanity_check, ExportConfig, ExportReport, Exporter};
pub use metadata::{ArtifactMetadata, WeightFormat};
pub use quantize::{QuantizedNetwork, QuantizedTensor};
pub use signature::{DType, ServingSignature, TensorSpec, INPUT_NAME, OUTPUT_NAME, SIGNATURE_NAME};
