//! Gated recurrent unit layer
//!
//! Gate layout follows the Keras convention: kernels are `(in, 3 * units)`
//! with the update (z), reset (r), and candidate (h) blocks in that order,
//! and the reset gate is applied after the recurrent matmul (`reset_after`),
//! which is why there are separate input and recurrent biases.
//!
//! ```text
//! z  = σ(x·Wz + bz + h·Uz + rz)
//! r  = σ(x·Wr + br + h·Ur + rr)
//! c  = tanh(x·Wh + bh + r ⊙ (h·Uh + rh))
//! h' = z ⊙ h + (1 − z) ⊙ c
//! ```

use ndarray::{concatenate, s, Array1, Array2, Array3, ArrayView2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::layers::{glorot_uniform, sigmoid};
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GruLayer {
    pub(crate) kernel: Array2<f32>,
    pub(crate) recurrent_kernel: Array2<f32>,
    pub(crate) input_bias: Array1<f32>,
    pub(crate) recurrent_bias: Array1<f32>,
    units: usize,
}

#[derive(Debug, Clone)]
pub struct GruGradients {
    pub kernel: Array2<f32>,
    pub recurrent_kernel: Array2<f32>,
    pub input_bias: Array1<f32>,
    pub recurrent_bias: Array1<f32>,
}

/// Per-step activations kept for backpropagation through time
#[derive(Debug, Clone)]
struct StepCache {
    x: Array2<f32>,
    h_prev: Array2<f32>,
    z: Array2<f32>,
    r: Array2<f32>,
    c: Array2<f32>,
    hh: Array2<f32>,
}

#[derive(Debug, Clone)]
pub struct GruCache {
    steps: Vec<StepCache>,
}

impl GruLayer {
    pub fn new<R: Rng>(rng: &mut R, input_dim: usize, units: usize) -> Self {
        Self {
            kernel: glorot_uniform(rng, input_dim, 3 * units),
            recurrent_kernel: glorot_uniform(rng, units, 3 * units),
            input_bias: Array1::zeros(3 * units),
            recurrent_bias: Array1::zeros(3 * units),
            units,
        }
    }

    pub fn units(&self) -> usize {
        self.units
    }

    pub fn input_dim(&self) -> usize {
        self.kernel.nrows()
    }

    pub fn n_params(&self) -> usize {
        self.kernel.len() + self.recurrent_kernel.len() + self.input_bias.len() + self.recurrent_bias.len()
    }

    /// Run over `(batch, steps, features)` and return every hidden state `(batch, steps, units)`
    pub fn forward(&self, x: &Array3<f32>) -> Array3<f32> {
        let (batch, steps, _) = x.dim();
        let mut h = Array2::zeros((batch, self.units));
        let mut outputs = Array3::zeros((batch, steps, self.units));

        for t in 0..steps {
            let (h_next, _) = self.step(x.index_axis(Axis(1), t), &h);
            outputs.index_axis_mut(Axis(1), t).assign(&h_next);
            h = h_next;
        }
        outputs
    }

    pub(crate) fn forward_cached(&self, x: &Array3<f32>) -> (Array3<f32>, GruCache) {
        let (batch, steps, _) = x.dim();
        let mut h = Array2::zeros((batch, self.units));
        let mut outputs = Array3::zeros((batch, steps, self.units));
        let mut cache = GruCache { steps: Vec::with_capacity(steps) };

        for t in 0..steps {
            let (h_next, step) = self.step(x.index_axis(Axis(1), t), &h);
            outputs.index_axis_mut(Axis(1), t).assign(&h_next);
            cache.steps.push(step);
            h = h_next;
        }
        (outputs, cache)
    }

    fn step(&self, x_t: ArrayView2<f32>, h_prev: &Array2<f32>) -> (Array2<f32>, StepCache) {
        let u = self.units;
        let xw = x_t.dot(&self.kernel) + &self.input_bias;
        let hu = h_prev.dot(&self.recurrent_kernel) + &self.recurrent_bias;

        let z = (&xw.slice(s![.., 0..u]) + &hu.slice(s![.., 0..u])).mapv(sigmoid);
        let r = (&xw.slice(s![.., u..2 * u]) + &hu.slice(s![.., u..2 * u])).mapv(sigmoid);
        let hh = hu.slice(s![.., 2 * u..]).to_owned();
        let c = (&xw.slice(s![.., 2 * u..]) + &(&r * &hh)).mapv(f32::tanh);

        let h = &z * h_prev + &((1.0 - &z) * &c);

        let cache = StepCache {
            x: x_t.to_owned(),
            h_prev: h_prev.clone(),
            z,
            r,
            c,
            hh,
        };
        (h, cache)
    }

    /// Backpropagation through time.
    ///
    /// `d_outputs` is the loss gradient w.r.t. every hidden state the layer
    /// emitted. Returns parameter gradients and the gradient w.r.t. the input.
    pub(crate) fn backward(&self, cache: &GruCache, d_outputs: &Array3<f32>) -> Result<(GruGradients, Array3<f32>)> {
        let (batch, steps, _) = d_outputs.dim();
        let input_dim = self.input_dim();

        let mut grads = GruGradients {
            kernel: Array2::zeros(self.kernel.raw_dim()),
            recurrent_kernel: Array2::zeros(self.recurrent_kernel.raw_dim()),
            input_bias: Array1::zeros(self.input_bias.len()),
            recurrent_bias: Array1::zeros(self.recurrent_bias.len()),
        };
        let mut d_x = Array3::zeros((batch, steps, input_dim));
        let mut d_h_next: Array2<f32> = Array2::zeros((batch, self.units));

        for t in (0..steps).rev() {
            let step = &cache.steps[t];
            let d_h = &d_outputs.index_axis(Axis(1), t) + &d_h_next;

            let d_z = &d_h * &(&step.h_prev - &step.c);
            let d_c = &d_h * &(1.0 - &step.z);
            let d_c_pre = &d_c * &(1.0 - &(&step.c * &step.c));
            let d_r = &d_c_pre * &step.hh;

            let d_z_pre = &d_z * &(&step.z * &(1.0 - &step.z));
            let d_r_pre = &d_r * &(&step.r * &(1.0 - &step.r));
            let d_hh = &d_c_pre * &step.r;

            let d_xw = concatenate(Axis(1), &[d_z_pre.view(), d_r_pre.view(), d_c_pre.view()])?;
            let d_hu = concatenate(Axis(1), &[d_z_pre.view(), d_r_pre.view(), d_hh.view()])?;

            grads.kernel += &step.x.t().dot(&d_xw);
            grads.input_bias += &d_xw.sum_axis(Axis(0));
            grads.recurrent_kernel += &step.h_prev.t().dot(&d_hu);
            grads.recurrent_bias += &d_hu.sum_axis(Axis(0));

            d_x.index_axis_mut(Axis(1), t).assign(&d_xw.dot(&self.kernel.t()));
            d_h_next = &d_h * &step.z + &d_hu.dot(&self.recurrent_kernel.t());
        }

        Ok((grads, d_x))
    }
}
