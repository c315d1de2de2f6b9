//! Recurrent classifier definition
//!
//! A small GRU network over one-step feature sequences:
//! - Keras-compatible GRU layers with backpropagation through time
//! - ReLU dense head with inverted dropout
//! - 6-way softmax output

mod config;
mod gru;
mod layers;
mod network;

pub use config::ModelConfig;
pub use gru::{GruGradients, GruLayer};
pub use layers::{softmax_rows, Activation, DenseGradients, DenseLayer};
pub use network::{argmax, loss_and_accuracy, ForwardCache, HarNetwork, LayerSummary, NetworkGradients, LOSS_EPSILON};
