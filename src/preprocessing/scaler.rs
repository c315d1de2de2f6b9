//! Z-score feature scaling

use crate::error::{HarError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default epsilon added to every standard deviation
pub const DEFAULT_EPSILON: f64 = 1e-8;

/// Standard scaler: (x - mean) / (std + epsilon)
///
/// Statistics are population statistics (divide by n) and are computed once,
/// from the training split only. The fitted scaler is then applied unchanged
/// to every other split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Array1<f64>,
    std: Array1<f64>,
    epsilon: f64,
    is_fitted: bool,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new(DEFAULT_EPSILON)
    }
}

impl StandardScaler {
    pub fn new(epsilon: f64) -> Self {
        Self {
            mean: Array1::zeros(0),
            std: Array1::zeros(0),
            epsilon,
            is_fitted: false,
        }
    }

    /// Fit per-column mean and standard deviation
    pub fn fit(&mut self, x: &Array2<f32>) -> Result<&mut Self> {
        let n = x.nrows();
        if n == 0 {
            return Err(HarError::DataError("cannot fit scaler on an empty split".to_string()));
        }

        let x64 = x.mapv(f64::from);
        let mean = x64
            .mean_axis(Axis(0))
            .ok_or_else(|| HarError::DataError("cannot compute mean of empty split".to_string()))?;
        let centered = &x64 - &mean;
        let var = centered.mapv(|v| v * v).sum_axis(Axis(0)) / n as f64;
        let std = var.mapv(f64::sqrt) + self.epsilon;

        self.mean = mean;
        self.std = std;
        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        if !self.is_fitted {
            return Err(HarError::ModelNotFitted);
        }
        if x.ncols() != self.mean.len() {
            return Err(HarError::shape(self.mean.len(), x.ncols()));
        }

        let mut out = x.clone();
        for mut row in out.rows_mut() {
            for ((v, &m), &s) in row.iter_mut().zip(self.mean.iter()).zip(self.std.iter()) {
                *v = ((f64::from(*v) - m) / s) as f32;
            }
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<f32>) -> Result<Array2<f32>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn std(&self) -> &Array1<f64> {
        &self.std
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Persist the fitted statistics as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_scaler_zero_mean_unit_std() {
        let x = array![[1.0f32, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0], [5.0, 50.0]];

        let mut scaler = StandardScaler::default();
        let scaled = scaler.fit_transform(&x).unwrap();

        for col in scaled.columns() {
            let n = col.len() as f64;
            let mean: f64 = col.iter().map(|&v| v as f64).sum::<f64>() / n;
            let var: f64 = col.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
            assert!(mean.abs() < 1e-6);
            assert!((var.sqrt() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_constant_column_uses_epsilon() {
        let x = array![[3.0f32], [3.0], [3.0]];
        let mut scaler = StandardScaler::default();
        let scaled = scaler.fit_transform(&x).unwrap();
        assert!(scaled.iter().all(|v| v.is_finite() && *v == 0.0));
        assert!((scaler.std()[0] - DEFAULT_EPSILON).abs() < 1e-15);
    }

    #[test]
    fn test_transform_before_fit() {
        let scaler = StandardScaler::default();
        let x = array![[1.0f32]];
        assert!(matches!(scaler.transform(&x), Err(HarError::ModelNotFitted)));
    }

    #[test]
    fn test_column_mismatch() {
        let mut scaler = StandardScaler::default();
        scaler.fit(&array![[1.0f32, 2.0], [3.0, 4.0]]).unwrap();
        assert!(matches!(
            scaler.transform(&array![[1.0f32, 2.0, 3.0]]),
            Err(HarError::ShapeError { .. })
        ));
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler.json");

        let mut scaler = StandardScaler::default();
        scaler.fit(&array![[1.0f32, 2.0], [3.0, 8.0]]).unwrap();
        scaler.save(&path).unwrap();

        let loaded = StandardScaler::load(&path).unwrap();
        assert!(loaded.is_fitted());
        assert_eq!(loaded.mean(), scaler.mean());
        assert_eq!(loaded.std(), scaler.std());
    }
}
