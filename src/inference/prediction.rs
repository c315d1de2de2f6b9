//! Prediction result types

use crate::activity::{Activity, NUM_CLASSES};
use crate::error::{HarError, Result};
use crate::model::argmax;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Probability per activity, serialized as a name → probability object in class order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProbabilities([f32; NUM_CLASSES]);

impl ClassProbabilities {
    pub fn new(values: &[f32]) -> Result<Self> {
        let arr: [f32; NUM_CLASSES] = values
            .try_into()
            .map_err(|_| HarError::shape(NUM_CLASSES, values.len()))?;
        Ok(Self(arr))
    }

    pub fn get(&self, activity: Activity) -> f32 {
        self.0[activity.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Activity, f32)> + '_ {
        Activity::ALL.iter().copied().zip(self.0.iter().copied())
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn sum(&self) -> f32 {
        self.0.iter().sum()
    }
}

impl Serialize for ClassProbabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(NUM_CLASSES))?;
        for (activity, p) in self.iter() {
            map.serialize_entry(activity.name(), &p)?;
        }
        map.end()
    }
}

/// Classification of a single feature vector
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Prediction {
    /// Arg-max class
    pub label: Activity,
    /// Probability of `label`
    pub confidence: f32,
    pub probabilities: ClassProbabilities,
}

impl Prediction {
    /// Build from one row of softmax output; fails on non-finite values
    pub fn from_probabilities(values: &[f32]) -> Result<Self> {
        if values.iter().any(|p| !p.is_finite()) {
            return Err(HarError::InferenceFailure("model produced non-finite probabilities".to_string()));
        }
        let probabilities = ClassProbabilities::new(values)?;
        let label = Activity::from_index(argmax(values.iter().copied()))?;
        Ok(Self {
            label,
            confidence: probabilities.get(label),
            probabilities,
        })
    }
}
