//! Symmetric per-tensor int8 weight quantization

use crate::error::{HarError, Result};
use crate::model::{HarNetwork, ModelConfig};
use ndarray::{ArrayD, ArrayViewD, IxDyn};
use serde::{Deserialize, Serialize};

const QMAX: f32 = 127.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantizedTensor {
    pub shape: Vec<usize>,
    /// Real value of one quantization step
    pub scale: f32,
    pub values: Vec<i8>,
}

impl QuantizedTensor {
    pub fn quantize(tensor: &ArrayViewD<'_, f32>) -> Self {
        let max_abs = tensor.iter().fold(0.0f32, |acc, v| acc.max(v.abs()));
        let scale = if max_abs > 0.0 { max_abs / QMAX } else { 1.0 };
        let values = tensor
            .iter()
            .map(|&v| (v / scale).round().clamp(-QMAX, QMAX) as i8)
            .collect();
        Self {
            shape: tensor.shape().to_vec(),
            scale,
            values,
        }
    }

    pub fn dequantize(&self) -> Result<ArrayD<f32>> {
        let data = self.values.iter().map(|&q| f32::from(q) * self.scale).collect();
        Ok(ArrayD::from_shape_vec(IxDyn(&self.shape), data)?)
    }

    /// Largest absolute reconstruction error this tensor can have
    pub fn max_error(&self) -> f32 {
        self.scale / 2.0
    }
}

/// A network whose parameter tensors are stored as int8
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantizedNetwork {
    pub config: ModelConfig,
    pub tensors: Vec<QuantizedTensor>,
}

impl QuantizedNetwork {
    pub fn from_network(network: &HarNetwork) -> Self {
        Self {
            config: network.config().clone(),
            tensors: network.parameters().iter().map(QuantizedTensor::quantize).collect(),
        }
    }

    /// Rebuild a float network with dequantized weights
    pub fn to_network(&self) -> Result<HarNetwork> {
        let mut network = HarNetwork::new(self.config.clone())?;
        let params = network.parameters_mut();
        if params.len() != self.tensors.len() {
            return Err(HarError::ModelLoadFailure(format!(
                "expected {} quantized tensors, found {}",
                params.len(),
                self.tensors.len()
            )));
        }
        for (mut param, tensor) in params.into_iter().zip(&self.tensors) {
            if param.shape() != tensor.shape.as_slice() {
                return Err(HarError::shape(param.shape(), &tensor.shape));
            }
            param.assign(&tensor.dequantize()?);
        }
        Ok(network)
    }

    pub fn size_bytes(&self) -> usize {
        self.tensors.iter().map(|t| t.values.len() + std::mem::size_of::<f32>()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    #[test]
    fn test_quantize_tensor() {
        let t = array![[-1.0f32, 0.5], [0.0, 0.25]].into_dyn();
        let q = QuantizedTensor::quantize(&t.view());
        assert_eq!(q.values[0], -127);
        assert_eq!(q.values[2], 0);
        let back = q.dequantize().unwrap();
        for (a, b) in t.iter().zip(back.iter()) {
            assert!((a - b).abs() <= q.max_error() + 1e-7);
        }
    }

    #[test]
    fn test_all_zero_tensor() {
        let t = ArrayD::<f32>::zeros(IxDyn(&[3]));
        let q = QuantizedTensor::quantize(&t.view());
        assert_eq!(q.scale, 1.0);
        assert!(q.dequantize().unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_network_round_trip_is_close() {
        let config = ModelConfig::new().with_input(1, 12).with_gru_units(vec![8]).with_dense_units(vec![8]);
        let network = HarNetwork::new(config).unwrap();
        let quantized = QuantizedNetwork::from_network(&network);
        let restored = quantized.to_network().unwrap();

        let x = Array3::from_shape_fn((3, 1, 12), |(b, _, f)| (b as f32 - 1.0) * 0.3 + f as f32 * 0.05);
        let a = network.forward(&x).unwrap();
        let b = restored.forward(&x).unwrap();
        for (p, q) in a.iter().zip(b.iter()) {
            assert!((p - q).abs() < 0.05);
        }
        assert!(quantized.size_bytes() < network.n_params() * 4);
    }
}
