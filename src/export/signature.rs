//! Named input/output tensor contract of an exported model

use crate::error::{HarError, Result};
use crate::model::ModelConfig;
use serde::{Deserialize, Serialize};

pub const SIGNATURE_NAME: &str = "serving_default";
pub const INPUT_NAME: &str = "input";
pub const OUTPUT_NAME: &str = "output";

/// Dynamic (batch) dimension marker in a tensor shape
pub const DYNAMIC_DIM: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Float32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorSpec {
    pub name: String,
    pub dtype: DType,
    pub shape: Vec<i64>,
}

impl TensorSpec {
    pub fn float32(name: impl Into<String>, shape: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            dtype: DType::Float32,
            shape,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServingSignature {
    pub name: String,
    pub inputs: Vec<TensorSpec>,
    pub outputs: Vec<TensorSpec>,
}

impl ServingSignature {
    /// `input: (batch, timesteps, features)` → `output: (batch, classes)`
    pub fn for_config(config: &ModelConfig) -> Self {
        Self {
            name: SIGNATURE_NAME.to_string(),
            inputs: vec![TensorSpec::float32(
                INPUT_NAME,
                vec![DYNAMIC_DIM, config.timesteps as i64, config.n_features as i64],
            )],
            outputs: vec![TensorSpec::float32(
                OUTPUT_NAME,
                vec![DYNAMIC_DIM, config.n_classes as i64],
            )],
        }
    }

    /// The `(batch, 1, 561)` → `(batch, 6)` serving contract
    pub fn canonical() -> Self {
        Self::for_config(&ModelConfig::default())
    }

    pub fn input(&self) -> Option<&TensorSpec> {
        self.inputs.iter().find(|t| t.name == INPUT_NAME)
    }

    pub fn output(&self) -> Option<&TensorSpec> {
        self.outputs.iter().find(|t| t.name == OUTPUT_NAME)
    }

    /// Feature count per timestep declared by the input tensor
    pub fn n_features(&self) -> Option<usize> {
        self.input().and_then(|t| t.shape.last()).map(|&d| d as usize)
    }

    /// Reject signatures that differ from the one `config` would produce
    pub fn check_matches(&self, config: &ModelConfig) -> Result<()> {
        let expected = Self::for_config(config);
        if *self != expected {
            return Err(HarError::ModelLoadFailure(format!(
                "signature mismatch: expected {:?} -> {:?}, found {:?} -> {:?}",
                expected.inputs, expected.outputs, self.inputs, self.outputs
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_contract() {
        let sig = ServingSignature::canonical();
        assert_eq!(sig.name, "serving_default");
        let input = sig.input().unwrap();
        assert_eq!(input.shape, vec![-1, 1, 561]);
        assert_eq!(input.dtype, DType::Float32);
        assert_eq!(sig.output().unwrap().shape, vec![-1, 6]);
        assert_eq!(sig.n_features(), Some(561));
    }

    #[test]
    fn test_json_layout() {
        let json = serde_json::to_value(ServingSignature::canonical()).unwrap();
        assert_eq!(json["inputs"][0]["name"], "input");
        assert_eq!(json["inputs"][0]["dtype"], "float32");
        assert_eq!(json["outputs"][0]["name"], "output");
    }

    #[test]
    fn test_mismatch_is_load_failure() {
        let mut sig = ServingSignature::canonical();
        sig.outputs[0].name = "probs".to_string();
        assert!(matches!(
            sig.check_matches(&ModelConfig::default()),
            Err(HarError::ModelLoadFailure(_))
        ));
        assert!(ServingSignature::canonical().check_matches(&ModelConfig::default()).is_ok());
    }
}
