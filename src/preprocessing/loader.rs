//! Raw dataset loading
//!
//! Reads the whitespace-separated text tables of a dataset split:
//! `<raw>/<split>/X_<split>.txt` holds one sample per line and
//! `<raw>/<split>/y_<split>.txt` holds one 1-based activity label per line.

use crate::activity::Activity;
use crate::error::{HarError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

/// Dataset split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }

    pub fn features_path(self, raw_dir: &Path) -> PathBuf {
        raw_dir.join(self.as_str()).join(format!("X_{}.txt", self.as_str()))
    }

    pub fn labels_path(self, raw_dir: &Path) -> PathBuf {
        raw_dir.join(self.as_str()).join(format!("y_{}.txt", self.as_str()))
    }
}

/// Load features and 0-based labels for a split
pub fn load_split(raw_dir: &Path, split: Split) -> Result<(Array2<f32>, Array1<u8>)> {
    let start = Instant::now();
    let x = read_feature_table(&split.features_path(raw_dir))?;
    let y = read_label_column(&split.labels_path(raw_dir))?;

    if x.nrows() != y.len() {
        return Err(HarError::DataError(format!(
            "{} split has {} feature rows but {} labels",
            split.as_str(),
            x.nrows(),
            y.len()
        )));
    }

    debug!(
        split = split.as_str(),
        rows = x.nrows(),
        cols = x.ncols(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Loaded raw split"
    );
    Ok((x, y))
}

/// Parse a whitespace-separated numeric table; every row must have the same width
pub fn read_feature_table(path: &Path) -> Result<Array2<f32>> {
    let file = File::open(path)
        .map_err(|e| HarError::DataError(format!("{}: {}", path.display(), e)))?;
    let reader = BufReader::new(file);

    let mut values = Vec::new();
    let mut n_cols: Option<usize> = None;
    let mut n_rows = 0;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let before = values.len();
        for token in line.split_whitespace() {
            let v: f32 = token.parse().map_err(|_| {
                HarError::DataError(format!(
                    "{}:{}: not a number: {:?}",
                    path.display(),
                    line_no + 1,
                    token
                ))
            })?;
            values.push(v);
        }

        let width = values.len() - before;
        match n_cols {
            None => n_cols = Some(width),
            Some(expected) if expected != width => {
                return Err(HarError::DataError(format!(
                    "{}:{}: expected {} columns, found {}",
                    path.display(),
                    line_no + 1,
                    expected,
                    width
                )));
            }
            _ => {}
        }
        n_rows += 1;
    }

    let n_cols = n_cols.unwrap_or(0);
    Ok(Array2::from_shape_vec((n_rows, n_cols), values)?)
}

/// Parse a one-column label file and shift labels to 0-based class indices
pub fn read_label_column(path: &Path) -> Result<Array1<u8>> {
    let file = File::open(path)
        .map_err(|e| HarError::DataError(format!("{}: {}", path.display(), e)))?;
    let reader = BufReader::new(file);

    let mut labels = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let token = line.trim();
        if token.is_empty() {
            continue;
        }
        // labels are sometimes written as floats ("5.0000000e+00")
        let raw: f64 = token.parse().map_err(|_| {
            HarError::DataError(format!("{}:{}: not a label: {:?}", path.display(), line_no + 1, token))
        })?;
        if raw.fract() != 0.0 {
            return Err(HarError::DataError(format!(
                "{}:{}: non-integer label {}",
                path.display(),
                line_no + 1,
                raw
            )));
        }
        let activity = Activity::from_source_label(raw as i64)?;
        labels.push(activity.index() as u8);
    }

    Ok(Array1::from(labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_split(root: &Path, split: Split, x: &str, y: &str) {
        let dir = root.join(split.as_str());
        fs::create_dir_all(&dir).unwrap();
        fs::write(split.features_path(root), x).unwrap();
        fs::write(split.labels_path(root), y).unwrap();
    }

    #[test]
    fn test_load_split_shifts_labels() {
        let dir = tempfile::tempdir().unwrap();
        write_split(
            dir.path(),
            Split::Train,
            "  2.8858451e-001 -2.0294171e-002 1.0\n 1.0  2.0   3.0\n",
            "5\n1\n",
        );

        let (x, y) = load_split(dir.path(), Split::Train).unwrap();
        assert_eq!(x.dim(), (2, 3));
        assert!((x[[0, 0]] - 0.28858451).abs() < 1e-6);
        assert_eq!(y.to_vec(), vec![4, 0]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_split(dir.path(), Split::Test, "1 2 3\n4 5\n", "1\n2\n");
        assert!(matches!(load_split(dir.path(), Split::Test), Err(HarError::DataError(_))));
    }

    #[test]
    fn test_row_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        write_split(dir.path(), Split::Test, "1 2\n3 4\n", "1\n");
        assert!(matches!(load_split(dir.path(), Split::Test), Err(HarError::DataError(_))));
    }

    #[test]
    fn test_label_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        write_split(dir.path(), Split::Train, "1 2\n", "7\n");
        assert!(matches!(load_split(dir.path(), Split::Train), Err(HarError::InvalidInput(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_split(dir.path(), Split::Train).is_err());
    }
}
