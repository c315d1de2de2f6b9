//! Persisted preprocessing outputs

use crate::activity::NUM_CLASSES;
use crate::error::{HarError, Result};
use ndarray::{Array1, Array2, Array3, Axis};
use serde::{de::DeserializeOwned, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub const X_TRAIN_FILE: &str = "X_train.bin";
pub const X_TEST_FILE: &str = "X_test.bin";
pub const Y_TRAIN_FILE: &str = "y_train.bin";
pub const Y_TEST_FILE: &str = "y_test.bin";
pub const SCALER_FILE: &str = "scaler.json";

/// Normalized features and 0-based labels for both splits
#[derive(Debug, Clone)]
pub struct ProcessedData {
    pub x_train: Array2<f32>,
    pub x_test: Array2<f32>,
    pub y_train: Array1<u8>,
    pub y_test: Array1<u8>,
}

impl ProcessedData {
    /// Write the four arrays under their fixed file names
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        write_array(&dir.join(X_TRAIN_FILE), &self.x_train)?;
        write_array(&dir.join(X_TEST_FILE), &self.x_test)?;
        write_array(&dir.join(Y_TRAIN_FILE), &self.y_train)?;
        write_array(&dir.join(Y_TEST_FILE), &self.y_test)?;
        Ok(())
    }

    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let data = Self {
            x_train: read_array(&dir.join(X_TRAIN_FILE))?,
            x_test: read_array(&dir.join(X_TEST_FILE))?,
            y_train: read_array(&dir.join(Y_TRAIN_FILE))?,
            y_test: read_array(&dir.join(Y_TEST_FILE))?,
        };

        if data.x_train.nrows() != data.y_train.len() || data.x_test.nrows() != data.y_test.len() {
            return Err(HarError::DataError(format!(
                "processed arrays disagree: X_train {:?} / y_train {}, X_test {:?} / y_test {}",
                data.x_train.dim(),
                data.y_train.len(),
                data.x_test.dim(),
                data.y_test.len()
            )));
        }
        for (name, labels) in [(Y_TRAIN_FILE, &data.y_train), (Y_TEST_FILE, &data.y_test)] {
            if let Some(&bad) = labels.iter().find(|&&label| label as usize >= NUM_CLASSES) {
                return Err(HarError::DataError(format!(
                    "{}: label {} out of range 0..{}",
                    dir.join(name).display(),
                    bad,
                    NUM_CLASSES
                )));
            }
        }
        Ok(data)
    }

    pub fn n_features(&self) -> usize {
        self.x_train.ncols()
    }
}

/// Reshape `(samples, features)` into the `(samples, timesteps, features)` layout
/// the recurrent layer consumes; only one-step sequences are produced.
pub fn to_sequences(x: &Array2<f32>) -> Array3<f32> {
    x.clone().insert_axis(Axis(1))
}

fn write_array<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(writer, value)?;
    Ok(())
}

fn read_array<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)
        .map_err(|e| HarError::DataError(format!("{}: {}", path.display(), e)))?;
    Ok(bincode::deserialize_from(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_save_load_fixed_names() {
        let dir = tempfile::tempdir().unwrap();
        let data = ProcessedData {
            x_train: array![[0.5f32, -1.0], [1.5, 2.0]],
            x_test: array![[0.0f32, 0.25]],
            y_train: array![0u8, 5],
            y_test: array![3u8],
        };
        data.save(dir.path()).unwrap();

        for name in [X_TRAIN_FILE, X_TEST_FILE, Y_TRAIN_FILE, Y_TEST_FILE] {
            assert!(dir.path().join(name).exists(), "{} missing", name);
        }

        let loaded = ProcessedData::load(dir.path()).unwrap();
        assert_eq!(loaded.x_train, data.x_train);
        assert_eq!(loaded.y_test, data.y_test);
        assert_eq!(loaded.n_features(), 2);
    }

    #[test]
    fn test_load_rejects_out_of_range_labels() {
        let dir = tempfile::tempdir().unwrap();
        let data = ProcessedData {
            x_train: array![[0.5f32, -1.0], [1.5, 2.0]],
            x_test: array![[0.0f32, 0.25]],
            y_train: array![0u8, 1],
            y_test: array![6u8],
        };
        data.save(dir.path()).unwrap();
        assert!(matches!(ProcessedData::load(dir.path()), Err(HarError::DataError(_))));
    }

    #[test]
    fn test_to_sequences_adds_step_axis() {
        let x = array![[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let seq = to_sequences(&x);
        assert_eq!(seq.dim(), (2, 1, 3));
        assert_eq!(seq[[1, 0, 2]], 6.0);
    }
}
