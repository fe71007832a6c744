//! The data kinds an evaluation works on.

use serde::{Deserialize, Serialize};
use stash_persist::Persistable;
use stash_types::Kind;

use crate::error::{EvalError, EvalResult};

/// A dense row-major matrix of features.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    n_cols: usize,
    values: Vec<f64>,
}

impl FeatureMatrix {
    /// Build a matrix from rows. All rows must have the same length.
    pub fn new(rows: Vec<Vec<f64>>) -> EvalResult<Self> {
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(rows.len() * n_cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n_cols {
                return Err(EvalError::RaggedRows {
                    row: i,
                    expected: n_cols,
                    actual: row.len(),
                });
            }
            values.extend(row);
        }
        Ok(Self { n_cols, values })
    }

    pub fn n_rows(&self) -> usize {
        if self.n_cols == 0 {
            0
        } else {
            self.values.len() / self.n_cols
        }
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn row(&self, i: usize) -> Option<&[f64]> {
        let start = i.checked_mul(self.n_cols)?;
        self.values.get(start..start + self.n_cols)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on a zero chunk size.
        self.values.chunks_exact(self.n_cols.max(1))
    }
}

impl Persistable for FeatureMatrix {
    const KIND: Kind = Kind::FeatureMatrix;
    const TYPE_NAME: &'static str = "stash.feature_matrix";
}

/// Expected outputs, one per feature row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetVector(pub Vec<f64>);

impl TargetVector {
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Persistable for TargetVector {
    const KIND: Kind = Kind::TargetVector;
    const TYPE_NAME: &'static str = "stash.target_vector";
}

/// Outputs produced by an estimator, one per feature row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictedVector(pub Vec<f64>);

impl PredictedVector {
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Mean squared error against `expected`.
    pub fn mean_squared_error(&self, expected: &TargetVector) -> EvalResult<f64> {
        if self.len() != expected.len() {
            return Err(EvalError::ShapeMismatch {
                what: "predictions",
                expected: expected.len(),
                actual: self.len(),
            });
        }
        if self.is_empty() {
            return Ok(0.0);
        }
        let sum: f64 = self
            .0
            .iter()
            .zip(expected.values())
            .map(|(p, y)| (p - y) * (p - y))
            .sum();
        Ok(sum / self.len() as f64)
    }
}

impl Persistable for PredictedVector {
    const KIND: Kind = Kind::PredictedVector;
    const TYPE_NAME: &'static str = "stash.predicted_vector";
}

/// A named table of features with an optional target column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    pub columns: Vec<String>,
    pub features: FeatureMatrix,
    pub target: Option<TargetVector>,
}

impl DataSet {
    pub fn new(
        columns: Vec<String>,
        features: FeatureMatrix,
        target: Option<TargetVector>,
    ) -> EvalResult<Self> {
        if columns.len() != features.n_cols() {
            return Err(EvalError::ShapeMismatch {
                what: "column names",
                expected: features.n_cols(),
                actual: columns.len(),
            });
        }
        if let Some(target) = &target {
            if target.len() != features.n_rows() {
                return Err(EvalError::ShapeMismatch {
                    what: "target",
                    expected: features.n_rows(),
                    actual: target.len(),
                });
            }
        }
        Ok(Self {
            columns,
            features,
            target,
        })
    }
}

impl Persistable for DataSet {
    const KIND: Kind = Kind::DataSet;
    const TYPE_NAME: &'static str = "stash.data_set";
}
