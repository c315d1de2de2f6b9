//! Activity labels and the fixed index ↔ name mapping
//!
//! The index order matches the training label encoding: source labels are
//! 1-based (1 = Walking … 6 = Laying) and are shifted to 0-based during
//! preprocessing.

use serde::{Deserialize, Serialize};

use crate::error::{HarError, Result};

/// Number of activity classes
pub const NUM_CLASSES: usize = 6;

/// Number of features per sample
pub const NUM_FEATURES: usize = 561;

/// Sequence length the recurrent layer is run over
pub const NUM_TIMESTEPS: usize = 1;

/// Physical activity classified by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Activity {
    #[serde(rename = "Walking")]
    Walking,
    #[serde(rename = "Walking Upstairs")]
    WalkingUpstairs,
    #[serde(rename = "Walking Downstairs")]
    WalkingDownstairs,
    #[serde(rename = "Sitting")]
    Sitting,
    #[serde(rename = "Standing")]
    Standing,
    #[serde(rename = "Laying")]
    Laying,
}

impl Activity {
    /// All activities in class-index order
    pub const ALL: [Activity; NUM_CLASSES] = [
        Activity::Walking,
        Activity::WalkingUpstairs,
        Activity::WalkingDownstairs,
        Activity::Sitting,
        Activity::Standing,
        Activity::Laying,
    ];

    /// Display name used in API responses
    pub fn name(self) -> &'static str {
        match self {
            Activity::Walking => "Walking",
            Activity::WalkingUpstairs => "Walking Upstairs",
            Activity::WalkingDownstairs => "Walking Downstairs",
            Activity::Sitting => "Sitting",
            Activity::Standing => "Standing",
            Activity::Laying => "Laying",
        }
    }

    /// 0-based class index
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL.get(index).copied().ok_or_else(|| {
            HarError::InvalidInput(format!("class index {} out of range 0..{}", index, NUM_CLASSES))
        })
    }

    /// Map a 1-based label from the raw dataset files
    pub fn from_source_label(label: i64) -> Result<Self> {
        if !(1..=NUM_CLASSES as i64).contains(&label) {
            return Err(HarError::InvalidInput(format!(
                "source label {} out of range 1..={}",
                label, NUM_CLASSES
            )));
        }
        Self::from_index((label - 1) as usize)
    }

    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|a| a.name().to_string()).collect()
    }
}

impl std::fmt::Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
