//! Dense layer, activations, and dropout

use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Activation function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    ReLU,
    Softmax,
    Linear,
}

impl Activation {
    pub fn apply(self, z: &Array2<f32>) -> Array2<f32> {
        match self {
            Activation::ReLU => z.mapv(|v| v.max(0.0)),
            Activation::Linear => z.clone(),
            Activation::Softmax => softmax_rows(z),
        }
    }
}

/// Row-wise numerically stable softmax
pub fn softmax_rows(z: &Array2<f32>) -> Array2<f32> {
    let mut result = z.clone();
    for mut row in result.rows_mut() {
        let max = row.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    result
}

pub(crate) fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

/// Glorot/Xavier uniform initialization
pub(crate) fn glorot_uniform<R: Rng>(rng: &mut R, n_in: usize, n_out: usize) -> Array2<f32> {
    let limit = (6.0 / (n_in + n_out) as f32).sqrt();
    Array2::from_shape_simple_fn((n_in, n_out), || rng.gen_range(-limit..limit))
}

/// Fully connected layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    pub(crate) weights: Array2<f32>,
    pub(crate) bias: Array1<f32>,
    pub(crate) activation: Activation,
}

/// Gradients of a dense layer
#[derive(Debug, Clone)]
pub struct DenseGradients {
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
}

impl DenseLayer {
    pub fn new<R: Rng>(rng: &mut R, n_in: usize, n_out: usize, activation: Activation) -> Self {
        Self {
            weights: glorot_uniform(rng, n_in, n_out),
            bias: Array1::zeros(n_out),
            activation,
        }
    }

    pub fn input_dim(&self) -> usize {
        self.weights.nrows()
    }

    pub fn output_dim(&self) -> usize {
        self.weights.ncols()
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn n_params(&self) -> usize {
        self.weights.len() + self.bias.len()
    }

    /// Pre-activation output
    pub fn linear(&self, x: &Array2<f32>) -> Array2<f32> {
        x.dot(&self.weights) + &self.bias
    }

    pub fn forward(&self, x: &Array2<f32>) -> Array2<f32> {
        self.activation.apply(&self.linear(x))
    }

    /// Backward pass from the gradient w.r.t. the pre-activation
    pub fn backward(&self, input: &Array2<f32>, d_z: &Array2<f32>) -> (DenseGradients, Array2<f32>) {
        let grads = DenseGradients {
            weights: input.t().dot(d_z),
            bias: d_z.sum_axis(Axis(0)),
        };
        let d_input = d_z.dot(&self.weights.t());
        (grads, d_input)
    }
}

/// Inverted dropout mask: kept units are scaled by 1 / (1 - rate)
pub(crate) fn dropout_mask<R: Rng>(rng: &mut R, shape: (usize, usize), rate: f32) -> Array2<f32> {
    let keep = 1.0 - rate;
    Array2::from_shape_simple_fn(shape, || if rng.gen::<f32>() < keep { 1.0 / keep } else { 0.0 })
}
