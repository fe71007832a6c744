//! The estimator seam and two small reference models.

use serde::{Deserialize, Serialize};
use stash_persist::Persistable;
use stash_types::Kind;

use crate::data::{FeatureMatrix, PredictedVector, TargetVector};
use crate::error::{EvalError, EvalResult};

/// A trained model that maps feature rows to outputs.
///
/// Estimators are persisted like any other object, so an implementation
/// must serialize deterministically and declare [`Kind::Estimator`].
pub trait Estimator: Persistable {
    fn predict(&self, features: &FeatureMatrix) -> EvalResult<PredictedVector>;
}

/// Predicts the mean of the training targets for every row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeanRegressor {
    pub mean: f64,
}

impl MeanRegressor {
    pub fn fit(target: &TargetVector) -> Self {
        let mean = if target.is_empty() {
            0.0
        } else {
            target.values().iter().sum::<f64>() / target.len() as f64
        };
        Self { mean }
    }
}

impl Persistable for MeanRegressor {
    const KIND: Kind = Kind::Estimator;
    const TYPE_NAME: &'static str = "stash.mean_regressor";
}

impl Estimator for MeanRegressor {
    fn predict(&self, features: &FeatureMatrix) -> EvalResult<PredictedVector> {
        Ok(PredictedVector(vec![self.mean; features.n_rows()]))
    }
}

/// `y = intercept + weights · x`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: Vec<f64>,
    pub intercept: f64,
}

impl LinearModel {
    pub fn new(weights: Vec<f64>, intercept: f64) -> Self {
        Self { weights, intercept }
    }
}

impl Persistable for LinearModel {
    const KIND: Kind = Kind::Estimator;
    const TYPE_NAME: &'static str = "stash.linear_model";
}

impl Estimator for LinearModel {
    fn predict(&self, features: &FeatureMatrix) -> EvalResult<PredictedVector> {
        if features.n_rows() > 0 && features.n_cols() != self.weights.len() {
            return Err(EvalError::ShapeMismatch {
                what: "feature columns",
                expected: self.weights.len(),
                actual: features.n_cols(),
            });
        }
        let values = features
            .rows()
            .map(|row| {
                self.intercept
                    + row
                        .iter()
                        .zip(&self.weights)
                        .map(|(x, w)| x * w)
                        .sum::<f64>()
            })
            .collect();
        Ok(PredictedVector(values))
    }
}
