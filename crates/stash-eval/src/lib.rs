//! Estimator evaluation on top of Stash.
//!
//! Provides the data kinds an evaluation works on ([`FeatureMatrix`],
//! [`TargetVector`], [`PredictedVector`], [`DataSet`]), the [`Estimator`]
//! trait, and an [`Evaluator`] that runs an estimator and stores the whole
//! evaluation (model, inputs, expected and predicted outputs) as
//! deduplicated records.

pub mod data;
pub mod error;
pub mod estimator;
pub mod evaluator;

pub use data::{DataSet, FeatureMatrix, PredictedVector, TargetVector};
pub use error::{EvalError, EvalResult};
pub use estimator::{Estimator, LinearModel, MeanRegressor};
pub use evaluator::{EvaluationPlan, EvaluationResult, Evaluator, Input};
