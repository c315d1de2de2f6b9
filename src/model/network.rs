//! Recurrent activity classifier
//!
//! GRU stack → dropout → ReLU dense stack (each followed by dropout) →
//! softmax output. Dropout is only active in the training forward pass.

use ndarray::{s, Array2, Array3, ArrayViewD, ArrayViewMutD, Axis};
use rand::SeedableRng;
use rand::Rng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::config::ModelConfig;
use super::gru::{GruCache, GruGradients, GruLayer};
use super::layers::{dropout_mask, Activation, DenseGradients, DenseLayer};
use crate::error::{HarError, Result};

/// Probabilities are clipped into `[EPSILON, 1 - EPSILON]` before the log
pub const LOSS_EPSILON: f32 = 1e-7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarNetwork {
    config: ModelConfig,
    gru: Vec<GruLayer>,
    dense: Vec<DenseLayer>,
}

/// One row of [`HarNetwork::summary`]
#[derive(Debug, Clone, Serialize)]
pub struct LayerSummary {
    pub name: String,
    pub output_shape: String,
    pub params: usize,
}

/// Everything the backward pass needs from a training forward pass
pub struct ForwardCache {
    gru_caches: Vec<GruCache>,
    gru_dropout: Option<Array2<f32>>,
    /// Input to each dense layer (after dropout)
    dense_inputs: Vec<Array2<f32>>,
    /// Pre-activation of each hidden dense layer
    dense_pre: Vec<Array2<f32>>,
    dense_dropout: Vec<Option<Array2<f32>>>,
    timesteps: usize,
}

/// Gradients for every parameter tensor, in [`HarNetwork::parameters_mut`] order
pub struct NetworkGradients {
    pub gru: Vec<GruGradients>,
    pub dense: Vec<DenseGradients>,
}

impl NetworkGradients {
    pub fn views(&self) -> Vec<ArrayViewD<'_, f32>> {
        let mut views = Vec::new();
        for g in &self.gru {
            views.push(g.kernel.view().into_dyn());
            views.push(g.recurrent_kernel.view().into_dyn());
            views.push(g.input_bias.view().into_dyn());
            views.push(g.recurrent_bias.view().into_dyn());
        }
        for g in &self.dense {
            views.push(g.weights.view().into_dyn());
            views.push(g.bias.view().into_dyn());
        }
        views
    }
}

impl HarNetwork {
    /// Build a freshly initialized network
    pub fn new(config: ModelConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let mut gru = Vec::with_capacity(config.gru_units.len());
        let mut input_dim = config.n_features;
        for &units in &config.gru_units {
            gru.push(GruLayer::new(&mut rng, input_dim, units));
            input_dim = units;
        }

        let mut dense = Vec::with_capacity(config.dense_units.len() + 1);
        for &units in &config.dense_units {
            dense.push(DenseLayer::new(&mut rng, input_dim, units, Activation::ReLU));
            input_dim = units;
        }
        dense.push(DenseLayer::new(&mut rng, input_dim, config.n_classes, Activation::Softmax));

        Ok(Self { config, gru, dense })
    }

    /// Reassemble a network from stored layers, checking that they chain
    pub fn from_parts(config: ModelConfig, gru: Vec<GruLayer>, dense: Vec<DenseLayer>) -> Result<Self> {
        config.validate()?;
        let network = Self { config, gru, dense };
        network.check_consistency()?;
        Ok(network)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn gru_layers(&self) -> &[GruLayer] {
        &self.gru
    }

    pub fn dense_layers(&self) -> &[DenseLayer] {
        &self.dense
    }

    pub fn input_shape(&self) -> (usize, usize) {
        (self.config.timesteps, self.config.n_features)
    }

    pub fn n_classes(&self) -> usize {
        self.config.n_classes
    }

    pub fn n_params(&self) -> usize {
        self.gru.iter().map(GruLayer::n_params).sum::<usize>()
            + self.dense.iter().map(DenseLayer::n_params).sum::<usize>()
    }

    /// Inference forward pass: `(batch, timesteps, features)` → `(batch, classes)` probabilities
    pub fn forward(&self, x: &Array3<f32>) -> Result<Array2<f32>> {
        self.check_input(x)?;

        let mut seq = x.clone();
        for layer in &self.gru {
            seq = layer.forward(&seq);
        }
        let mut a = last_step(&seq);
        for layer in &self.dense {
            a = layer.forward(&a);
        }
        Ok(a)
    }

    /// Training forward pass with dropout; returns probabilities and the cache for backprop
    pub fn forward_train<R: Rng>(&self, x: &Array3<f32>, rng: &mut R) -> Result<(Array2<f32>, ForwardCache)> {
        self.check_input(x)?;
        let rate = self.config.dropout;

        let mut gru_caches = Vec::with_capacity(self.gru.len());
        let mut seq = x.clone();
        for layer in &self.gru {
            let (out, cache) = layer.forward_cached(&seq);
            gru_caches.push(cache);
            seq = out;
        }

        let mut a = last_step(&seq);
        let gru_dropout = (rate > 0.0).then(|| dropout_mask(rng, a.dim(), rate));
        if let Some(mask) = &gru_dropout {
            a = &a * mask;
        }

        let n_hidden = self.dense.len() - 1;
        let mut dense_inputs = Vec::with_capacity(self.dense.len());
        let mut dense_pre = Vec::with_capacity(n_hidden);
        let mut dense_dropout = Vec::with_capacity(n_hidden);

        for layer in &self.dense[..n_hidden] {
            dense_inputs.push(a.clone());
            let z = layer.linear(&a);
            a = layer.activation().apply(&z);
            dense_pre.push(z);

            let mask = (rate > 0.0).then(|| dropout_mask(rng, a.dim(), rate));
            if let Some(m) = &mask {
                a = &a * m;
            }
            dense_dropout.push(mask);
        }

        dense_inputs.push(a.clone());
        let probs = self.dense[n_hidden].forward(&a);

        let cache = ForwardCache {
            gru_caches,
            gru_dropout,
            dense_inputs,
            dense_pre,
            dense_dropout,
            timesteps: x.dim().1,
        };
        Ok((probs, cache))
    }

    /// Gradients of the mean sparse categorical cross-entropy
    pub fn backward(&self, cache: &ForwardCache, probs: &Array2<f32>, labels: &[u8]) -> Result<NetworkGradients> {
        let batch = probs.nrows();
        if labels.len() != batch {
            return Err(HarError::shape(batch, labels.len()));
        }

        // softmax + cross-entropy: dL/dz = (p - onehot) / batch
        let mut d_z = probs.clone();
        for (mut row, &label) in d_z.rows_mut().into_iter().zip(labels) {
            let label = label as usize;
            if label >= self.config.n_classes {
                return Err(HarError::InvalidInput(format!("label {} out of range", label)));
            }
            row[label] -= 1.0;
        }
        d_z /= batch as f32;

        let n_hidden = self.dense.len() - 1;
        let mut dense_grads = Vec::with_capacity(self.dense.len());

        let (g, mut d_a) = self.dense[n_hidden].backward(&cache.dense_inputs[n_hidden], &d_z);
        dense_grads.push(g);

        for i in (0..n_hidden).rev() {
            if let Some(mask) = &cache.dense_dropout[i] {
                d_a = &d_a * mask;
            }
            let relu_grad = cache.dense_pre[i].mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
            let d_pre = &d_a * &relu_grad;
            let (g, d_in) = self.dense[i].backward(&cache.dense_inputs[i], &d_pre);
            dense_grads.push(g);
            d_a = d_in;
        }
        dense_grads.reverse();

        if let Some(mask) = &cache.gru_dropout {
            d_a = &d_a * mask;
        }

        // only the last step of the top GRU layer feeds the dense head
        let top_units = self.gru[self.gru.len() - 1].units();
        let mut d_seq = Array3::zeros((batch, cache.timesteps, top_units));
        d_seq.index_axis_mut(Axis(1), cache.timesteps - 1).assign(&d_a);

        let mut gru_grads = Vec::with_capacity(self.gru.len());
        for (layer, layer_cache) in self.gru.iter().zip(&cache.gru_caches).rev() {
            let (g, d_in) = layer.backward(layer_cache, &d_seq)?;
            gru_grads.push(g);
            d_seq = d_in;
        }
        gru_grads.reverse();

        Ok(NetworkGradients { gru: gru_grads, dense: dense_grads })
    }

    /// Views of every parameter tensor, in [`Self::parameters_mut`] order
    pub fn parameters(&self) -> Vec<ArrayViewD<'_, f32>> {
        let mut params = Vec::new();
        for layer in &self.gru {
            params.push(layer.kernel.view().into_dyn());
            params.push(layer.recurrent_kernel.view().into_dyn());
            params.push(layer.input_bias.view().into_dyn());
            params.push(layer.recurrent_bias.view().into_dyn());
        }
        for layer in &self.dense {
            params.push(layer.weights.view().into_dyn());
            params.push(layer.bias.view().into_dyn());
        }
        params
    }

    /// Mutable views of every parameter tensor, in a fixed order
    pub fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
        let mut params = Vec::new();
        for layer in &mut self.gru {
            params.push(layer.kernel.view_mut().into_dyn());
            params.push(layer.recurrent_kernel.view_mut().into_dyn());
            params.push(layer.input_bias.view_mut().into_dyn());
            params.push(layer.recurrent_bias.view_mut().into_dyn());
        }
        for layer in &mut self.dense {
            params.push(layer.weights.view_mut().into_dyn());
            params.push(layer.bias.view_mut().into_dyn());
        }
        params
    }

    /// Per-layer output shapes and parameter counts
    pub fn summary(&self) -> Vec<LayerSummary> {
        let mut rows = Vec::new();
        let last_gru = self.gru.len() - 1;
        for (i, layer) in self.gru.iter().enumerate() {
            let shape = if i == last_gru {
                format!("(None, {})", layer.units())
            } else {
                format!("(None, {}, {})", self.config.timesteps, layer.units())
            };
            rows.push(LayerSummary { name: format!("gru_{}", i), output_shape: shape, params: layer.n_params() });
        }
        for (i, layer) in self.dense.iter().enumerate() {
            rows.push(LayerSummary {
                name: format!("dense_{}", i),
                output_shape: format!("(None, {})", layer.output_dim()),
                params: layer.n_params(),
            });
        }
        rows
    }

    fn check_input(&self, x: &Array3<f32>) -> Result<()> {
        let (_, steps, features) = x.dim();
        if steps != self.config.timesteps || features != self.config.n_features {
            return Err(HarError::shape(
                (None::<usize>, self.config.timesteps, self.config.n_features),
                x.dim(),
            ));
        }
        Ok(())
    }

    fn check_consistency(&self) -> Result<()> {
        if self.gru.len() != self.config.gru_units.len()
            || self.dense.len() != self.config.dense_units.len() + 1
        {
            return Err(HarError::ConfigError("layer count does not match config".to_string()));
        }
        let mut input_dim = self.config.n_features;
        for (layer, &units) in self.gru.iter().zip(&self.config.gru_units) {
            if layer.input_dim() != input_dim || layer.units() != units {
                return Err(HarError::shape((input_dim, units), (layer.input_dim(), layer.units())));
            }
            input_dim = units;
        }
        let dense_units = self.config.dense_units.iter().chain(std::iter::once(&self.config.n_classes));
        let n_hidden = self.dense.len() - 1;
        for (i, (layer, &units)) in self.dense.iter().zip(dense_units).enumerate() {
            if layer.input_dim() != input_dim || layer.output_dim() != units {
                return Err(HarError::shape((input_dim, units), (layer.input_dim(), layer.output_dim())));
            }
            let expected = if i < n_hidden { Activation::ReLU } else { Activation::Softmax };
            if layer.activation() != expected {
                return Err(HarError::ConfigError(format!(
                    "dense layer {} uses {:?}, expected {:?}",
                    i,
                    layer.activation(),
                    expected
                )));
            }
            input_dim = units;
        }
        Ok(())
    }
}

fn last_step(seq: &Array3<f32>) -> Array2<f32> {
    let steps = seq.dim().1;
    seq.slice(s![.., steps - 1, ..]).to_owned()
}

/// Mean sparse categorical cross-entropy and accuracy for a batch of probabilities
pub fn loss_and_accuracy(probs: &Array2<f32>, labels: &[u8]) -> (f64, f64) {
    let n = probs.nrows().max(1) as f64;
    let mut loss = 0.0f64;
    let mut correct = 0usize;
    for (row, &label) in probs.rows().into_iter().zip(labels) {
        let p = row[label as usize].clamp(LOSS_EPSILON, 1.0 - LOSS_EPSILON);
        loss -= f64::from(p).ln();
        if argmax(row.iter().copied()) == label as usize {
            correct += 1;
        }
    }
    (loss / n, correct as f64 / n)
}

/// Index of the largest value; ties resolve to the lowest index
pub fn argmax(values: impl IntoIterator<Item = f32>) -> usize {
    let mut best = 0;
    let mut best_val = f32::NEG_INFINITY;
    for (i, v) in values.into_iter().enumerate() {
        if v > best_val {
            best = i;
            best_val = v;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_config() -> ModelConfig {
        ModelConfig::new()
            .with_input(2, 4)
            .with_gru_units(vec![3, 2])
            .with_dense_units(vec![5])
            .with_classes(3)
            .with_dropout(0.0)
            .with_seed(5)
    }

    fn tiny_batch() -> (Array3<f32>, Vec<u8>) {
        let x = Array3::from_shape_fn((4, 2, 4), |(b, t, f)| ((b * 7 + t * 3 + f) % 5) as f32 * 0.4 - 0.8);
        (x, vec![0, 2, 1, 2])
    }

    #[test]
    fn test_default_network_shapes() {
        let net = HarNetwork::new(ModelConfig::default()).unwrap();
        let probs = net.forward(&Array3::zeros((3, 1, 561))).unwrap();
        assert_eq!(probs.dim(), (3, 6));
        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-5);
        }
        // GRU(64): 3*64*(561+64) + 2*3*64; Dense(64); Dense(6)
        let expected = 3 * 64 * (561 + 64) + 2 * 3 * 64 + (64 * 64 + 64) + (64 * 6 + 6);
        assert_eq!(net.n_params(), expected);
    }

    #[test]
    fn test_wrong_input_shape() {
        let net = HarNetwork::new(ModelConfig::default()).unwrap();
        assert!(matches!(
            net.forward(&Array3::zeros((1, 1, 560))),
            Err(HarError::ShapeError { .. })
        ));
    }

    #[test]
    fn test_train_forward_matches_inference_without_dropout() {
        let net = HarNetwork::new(tiny_config()).unwrap();
        let (x, _) = tiny_batch();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let (train_probs, _) = net.forward_train(&x, &mut rng).unwrap();
        assert_eq!(train_probs, net.forward(&x).unwrap());
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        let mut net = HarNetwork::new(tiny_config()).unwrap();
        let (x, y) = tiny_batch();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);

        let (probs, cache) = net.forward_train(&x, &mut rng).unwrap();
        let grads = net.backward(&cache, &probs, &y).unwrap();
        let analytic: Vec<Vec<f32>> = grads.views().iter().map(|v| v.iter().copied().collect()).collect();

        // small enough that ReLU inputs near zero rarely change side; those that do are skipped
        let eps = 1e-4f32;
        let kink_crossed = |a: &ForwardCache, b: &ForwardCache| {
            a.dense_pre
                .iter()
                .zip(&b.dense_pre)
                .any(|(za, zb)| za.iter().zip(zb.iter()).any(|(p, q)| (*p > 0.0) != (*q > 0.0)))
        };

        let n_tensors = analytic.len();
        let (mut checked, mut skipped) = (0usize, 0usize);
        for t in 0..n_tensors {
            for i in 0..analytic[t].len() {
                let original = net.parameters_mut()[t].as_slice_mut().unwrap()[i];

                net.parameters_mut()[t].as_slice_mut().unwrap()[i] = original + eps;
                let (plus_probs, plus_cache) = net.forward_train(&x, &mut rng).unwrap();
                net.parameters_mut()[t].as_slice_mut().unwrap()[i] = original - eps;
                let (minus_probs, minus_cache) = net.forward_train(&x, &mut rng).unwrap();
                net.parameters_mut()[t].as_slice_mut().unwrap()[i] = original;

                if kink_crossed(&cache, &plus_cache) || kink_crossed(&cache, &minus_cache) {
                    skipped += 1;
                    continue;
                }
                let (plus, _) = loss_and_accuracy(&plus_probs, &y);
                let (minus, _) = loss_and_accuracy(&minus_probs, &y);

                let numeric = ((plus - minus) / (2.0 * eps as f64)) as f32;
                let diff = (numeric - analytic[t][i]).abs();
                assert!(
                    diff <= 2e-3 + 0.05 * numeric.abs(),
                    "tensor {} index {}: analytic {} numeric {}",
                    t,
                    i,
                    analytic[t][i],
                    numeric
                );
                checked += 1;
            }
        }
        assert!(checked > 10 * skipped.max(1), "checked {} skipped {}", checked, skipped);
    }

    #[test]
    fn test_argmax_ties_pick_lowest() {
        assert_eq!(argmax([0.2, 0.4, 0.4]), 1);
        assert_eq!(argmax([1.0 / 6.0; 6]), 0);
    }

    #[test]
    fn test_from_parts_checks_chain() {
        let net = HarNetwork::new(tiny_config()).unwrap();
        let mut dense = net.dense_layers().to_vec();
        dense.swap(0, 1);
        assert!(HarNetwork::from_parts(tiny_config(), net.gru_layers().to_vec(), dense).is_err());
        assert!(HarNetwork::from_parts(tiny_config(), net.gru_layers().to_vec(), net.dense_layers().to_vec()).is_ok());
    }

    #[test]
    fn test_from_parts_checks_activations() {
        let net = HarNetwork::new(tiny_config()).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);

        let mut linear_output = net.dense_layers().to_vec();
        linear_output[1] = DenseLayer::new(&mut rng, 5, 3, Activation::Linear);
        assert!(matches!(
            HarNetwork::from_parts(tiny_config(), net.gru_layers().to_vec(), linear_output),
            Err(HarError::ConfigError(_))
        ));

        let mut softmax_hidden = net.dense_layers().to_vec();
        softmax_hidden[0] = DenseLayer::new(&mut rng, 2, 5, Activation::Softmax);
        assert!(HarNetwork::from_parts(tiny_config(), net.gru_layers().to_vec(), softmax_hidden).is_err());
    }

    #[test]
    fn test_summary_rows() {
        let net = HarNetwork::new(ModelConfig::stacked()).unwrap();
        let summary = net.summary();
        assert_eq!(summary.len(), 4);
        assert_eq!(summary[0].output_shape, "(None, 1, 64)");
        assert_eq!(summary[1].output_shape, "(None, 32)");
        assert_eq!(summary.iter().map(|r| r.params).sum::<usize>(), net.n_params());
    }
}
