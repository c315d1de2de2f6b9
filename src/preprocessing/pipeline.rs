//! Train/test preprocessing pipeline

use crate::error::{HarError, Result};
use ndarray::Array2;
use std::time::Instant;
use tracing::info;

use super::config::PreprocessingConfig;
use super::loader::{load_split, Split};
use super::scaler::StandardScaler;
use super::store::{ProcessedData, SCALER_FILE};

/// Loads both raw splits, normalizes them with training statistics, and
/// persists the result.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    config: PreprocessingConfig,
    scaler: StandardScaler,
}

impl Preprocessor {
    pub fn new(config: PreprocessingConfig) -> Self {
        let scaler = StandardScaler::new(config.epsilon);
        Self { config, scaler }
    }

    /// Fitted scaler (populated after [`Preprocessor::run`] or [`Preprocessor::normalize`])
    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    /// Read the raw dataset, normalize, and write the processed arrays
    pub fn run(&mut self) -> Result<ProcessedData> {
        let start = Instant::now();
        let (x_train, y_train) = load_split(&self.config.raw_dir, Split::Train)?;
        let (x_test, y_test) = load_split(&self.config.raw_dir, Split::Test)?;

        let (x_train, x_test) = self.normalize(&x_train, &x_test)?;
        let data = ProcessedData { x_train, x_test, y_train, y_test };

        data.save(&self.config.processed_dir)?;
        self.scaler.save(self.config.processed_dir.join(SCALER_FILE))?;

        info!(
            processed_dir = %self.config.processed_dir.display(),
            train_rows = data.x_train.nrows(),
            test_rows = data.x_test.nrows(),
            features = data.n_features(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Preprocessing complete"
        );
        Ok(data)
    }

    /// Fit on the training split only and apply the same statistics to both splits
    pub fn normalize(
        &mut self,
        x_train: &Array2<f32>,
        x_test: &Array2<f32>,
    ) -> Result<(Array2<f32>, Array2<f32>)> {
        if let Some(expected) = self.config.expected_features {
            for (name, x) in [("train", x_train), ("test", x_test)] {
                if x.ncols() != expected {
                    return Err(HarError::DataError(format!(
                        "{} split has {} features, expected {}",
                        name,
                        x.ncols(),
                        expected
                    )));
                }
            }
        }
        if x_train.ncols() != x_test.ncols() {
            return Err(HarError::shape(x_train.ncols(), x_test.ncols()));
        }

        let train_norm = self.scaler.fit_transform(x_train)?;
        let test_norm = self.scaler.transform(x_test)?;
        Ok((train_norm, test_norm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Axis};
    use std::fs;
    use std::path::Path;

    fn write_raw(root: &Path) {
        for (split, x, y) in [
            ("train", "1 10\n2 20\n3 30\n4 40\n", "1\n2\n3\n4\n"),
            ("test", "10 0\n20 5\n", "5\n6\n"),
        ] {
            let dir = root.join(split);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(format!("X_{}.txt", split)), x).unwrap();
            fs::write(dir.join(format!("y_{}.txt", split)), y).unwrap();
        }
    }

    #[test]
    fn test_run_persists_and_normalizes() {
        let raw = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_raw(raw.path());

        let config = PreprocessingConfig::new()
            .with_raw_dir(raw.path())
            .with_processed_dir(out.path())
            .with_expected_features(Some(2));
        let mut pre = Preprocessor::new(config);
        let data = pre.run().unwrap();

        let mean = data.x_train.mean_axis(Axis(0)).unwrap();
        assert!(mean.iter().all(|m| m.abs() < 1e-5));
        assert_eq!(data.y_train.to_vec(), vec![0, 1, 2, 3]);
        assert_eq!(data.y_test.to_vec(), vec![4, 5]);

        assert!(out.path().join(SCALER_FILE).exists());
        let reloaded = ProcessedData::load(out.path()).unwrap();
        assert_eq!(reloaded.x_test, data.x_test);
    }

    #[test]
    fn test_test_split_uses_train_statistics() {
        let x_train = array![[1.0f32], [2.0], [3.0], [4.0]];
        let x_test = array![[10.0f32], [20.0]];

        let mut pre = Preprocessor::new(PreprocessingConfig::new().with_expected_features(None));
        let (_, test_norm) = pre.normalize(&x_train, &x_test).unwrap();

        // train mean 2.5, population std sqrt(1.25)
        let std = 1.25f64.sqrt() + 1e-8;
        assert!((test_norm[[0, 0]] as f64 - (10.0 - 2.5) / std).abs() < 1e-4);

        let mut test_only = StandardScaler::default();
        let independent = test_only.fit_transform(&x_test).unwrap();
        assert_ne!(test_norm, independent);
    }

    #[test]
    fn test_feature_count_checked() {
        let mut pre = Preprocessor::new(PreprocessingConfig::new());
        let x = array![[1.0f32, 2.0]];
        assert!(matches!(pre.normalize(&x, &x), Err(HarError::DataError(_))));
    }
}
