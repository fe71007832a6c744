//! Evaluation plans and persisted evaluation results.
//!
//! An [`Evaluator`] runs an estimator over a feature matrix, then stores the
//! estimator, the inputs, the expected outputs and the predictions as
//! deduplicated records, and links them with one evaluation row. All
//! hashing and storage goes through
//! [`PersistenceManager::get_or_create`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use stash_catalog::{EvaluationCatalog, EvaluationRow, NewEvaluation};
use stash_persist::{Persistable, PersistenceManager, Record};
use stash_types::RecordId;
use tracing::{debug, info};

use crate::data::{FeatureMatrix, PredictedVector, TargetVector};
use crate::error::{EvalError, EvalResult};
use crate::estimator::Estimator;

/// An evaluation input: either a plain object or an existing record.
pub enum Input<T: Persistable> {
    Object(T),
    Record(Record<T>),
}

/// What to evaluate.
pub struct EvaluationPlan<E: Estimator> {
    estimator: Input<E>,
    features: Input<FeatureMatrix>,
    expected: Input<TargetVector>,
    predicted: Option<Input<PredictedVector>>,
}

impl<E: Estimator> EvaluationPlan<E> {
    pub fn new(
        estimator: Input<E>,
        features: Input<FeatureMatrix>,
        expected: Input<TargetVector>,
    ) -> Self {
        Self {
            estimator,
            features,
            expected,
            predicted: None,
        }
    }

    /// Use known predictions instead of running the estimator.
    pub fn with_predictions(mut self, predicted: Input<PredictedVector>) -> Self {
        self.predicted = Some(predicted);
        self
    }
}

/// A stored evaluation with its four records.
///
/// Records returned by [`Evaluator::evaluate`] have their objects cached;
/// records returned by [`Evaluator::load_result`] load them on first access.
#[derive(Debug)]
pub struct EvaluationResult<E: Estimator> {
    pub id: RecordId,
    pub created_at: DateTime<Utc>,
    pub estimator: Record<E>,
    pub features: Record<FeatureMatrix>,
    pub expected: Record<TargetVector>,
    pub predicted: Record<PredictedVector>,
}

impl<E: Estimator> EvaluationResult<E> {
    pub fn mean_squared_error(&mut self) -> EvalResult<f64> {
        let predicted = object(&mut self.predicted)?;
        let expected = object(&mut self.expected)?;
        predicted.mean_squared_error(expected)
    }
}

fn object<T: Persistable>(record: &mut Record<T>) -> EvalResult<&T> {
    record
        .get_object()?
        .ok_or(EvalError::MissingInput(T::KIND))
}

fn committed_id<T: Persistable>(record: &Record<T>) -> EvalResult<RecordId> {
    record.id().ok_or(EvalError::MissingInput(T::KIND))
}

pub struct Evaluator {
    manager: PersistenceManager,
    evaluations: Arc<dyn EvaluationCatalog>,
}

impl Evaluator {
    pub fn new(manager: PersistenceManager, evaluations: Arc<dyn EvaluationCatalog>) -> Self {
        Self {
            manager,
            evaluations,
        }
    }

    pub fn manager(&self) -> &PersistenceManager {
        &self.manager
    }

    /// Run `estimator` over `features` without persisting anything.
    pub fn predict<E: Estimator>(
        &self,
        estimator: &mut Record<E>,
        features: &mut Record<FeatureMatrix>,
    ) -> EvalResult<PredictedVector> {
        let features = object(features)?;
        object(estimator)?.predict(features)
    }

    /// Run the plan and persist its records and the evaluation row.
    ///
    /// Plain objects are deduplicated through `get_or_create`; records that
    /// are not yet committed are committed. If the plan carries predictions
    /// the estimator is not run.
    pub fn evaluate<E: Estimator>(&self, plan: EvaluationPlan<E>) -> EvalResult<EvaluationResult<E>> {
        let mut estimator = self.resolve(plan.estimator)?;
        let mut features = self.resolve(plan.features)?;
        let mut expected = self.resolve(plan.expected)?;

        let n_rows = object(&mut features)?.n_rows();
        let n_expected = object(&mut expected)?.len();
        if n_expected != n_rows {
            return Err(EvalError::ShapeMismatch {
                what: "expected outputs",
                expected: n_rows,
                actual: n_expected,
            });
        }

        let mut predicted = match plan.predicted {
            Some(input) => self.resolve(input)?,
            None => {
                let predictions = self.predict(&mut estimator, &mut features)?;
                debug!(rows = predictions.len(), "estimator ran");
                self.manager.get_or_create(predictions)?.0
            }
        };
        let n_predicted = object(&mut predicted)?.len();
        if n_predicted != n_expected {
            return Err(EvalError::ShapeMismatch {
                what: "predictions",
                expected: n_expected,
                actual: n_predicted,
            });
        }

        let row = self.evaluations.insert_evaluation(NewEvaluation {
            estimator: committed_id(&estimator)?,
            features: committed_id(&features)?,
            expected: committed_id(&expected)?,
            predicted: committed_id(&predicted)?,
        })?;
        info!(id = %row.id, estimator = %row.estimator, "evaluation stored");

        Ok(EvaluationResult {
            id: row.id,
            created_at: row.created_at,
            estimator,
            features,
            expected,
            predicted,
        })
    }

    /// Rebuild a stored evaluation. Objects are loaded lazily.
    pub fn load_result<E: Estimator>(&self, id: RecordId) -> EvalResult<EvaluationResult<E>> {
        let row = self
            .evaluations
            .get_evaluation(id)?
            .ok_or(EvalError::NotFound(id))?;
        Ok(EvaluationResult {
            id: row.id,
            created_at: row.created_at,
            estimator: self.manager.load(row.estimator)?,
            features: self.manager.load(row.features)?,
            expected: self.manager.load(row.expected)?,
            predicted: self.manager.load(row.predicted)?,
        })
    }

    pub fn evaluations(&self) -> EvalResult<Vec<EvaluationRow>> {
        Ok(self.evaluations.evaluations()?)
    }

    fn resolve<T: Persistable>(&self, input: Input<T>) -> EvalResult<Record<T>> {
        match input {
            Input::Object(object) => Ok(self.manager.get_or_create(object)?.0),
            Input::Record(record) if record.is_committed() => Ok(record),
            Input::Record(mut record) => match record.commit() {
                Ok(()) => Ok(record),
                Err(e) if e.is_lost_race() => {
                    let hash = record
                        .object_hash()
                        .ok_or(EvalError::MissingInput(T::KIND))?;
                    let existing = self.manager.find_by_hash::<T>(&hash)?.ok_or(e)?;
                    Ok(existing)
                }
                Err(stash_persist::PersistError::MissingObject { kind }) => {
                    Err(EvalError::MissingInput(kind))
                }
                Err(e) => Err(e.into()),
            },
        }
    }
}
