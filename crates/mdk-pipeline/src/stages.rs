//! Collaborator boundaries for the black-box pipeline stages.
//!
//! Each trait is the contract of one external stage: ingestion, statistics,
//! schema inference, validation, transform, training, evaluation. The runner
//! only ever sees these seams; concrete numerical implementations live
//! outside this workspace (test stubs are in `mdk-testkit`).
//!
//! Implementations must be object-safe so the runner can hold
//! `Box<dyn ...>` collaborators without knowing concrete types.

use std::fmt;

use mdk_config::SplitConfig;
use mdk_schemas::{EvaluationResult, ModelArtifact};

use crate::contracts::{
    ExampleSet, Schema, Statistics, TrainedModel, TransformOutput, ValidationReport,
};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Failure inside an external collaborator. The runner wraps it with the
/// stage name; the message is whatever the collaborator can say about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorError(pub String);

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for CollaboratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for CollaboratorError {}

// ---------------------------------------------------------------------------
// Stage traits
// ---------------------------------------------------------------------------

/// Produces the labeled example set, partitioned into named splits.
pub trait ExampleGen {
    fn generate(
        &self,
        data_dir: &str,
        splits: &SplitConfig,
    ) -> Result<ExampleSet, CollaboratorError>;
}

/// Computes descriptive statistics over every split.
pub trait StatisticsGen {
    fn compute(&self, examples: &ExampleSet) -> Result<Statistics, CollaboratorError>;
}

/// Infers a feature schema from the statistics.
pub trait SchemaGen {
    fn infer(&self, statistics: &Statistics) -> Result<Schema, CollaboratorError>;
}

/// Checks a data batch against the schema; blocking anomalies abort the run.
pub trait ExampleValidator {
    fn validate(
        &self,
        statistics: &Statistics,
        schema: &Schema,
    ) -> Result<ValidationReport, CollaboratorError>;
}

/// Feature engineering: raw examples -> feature vectors + transform graph.
pub trait Transform {
    fn apply(
        &self,
        examples: &ExampleSet,
        schema: &Schema,
    ) -> Result<TransformOutput, CollaboratorError>;
}

/// Trains a candidate model from the transformed examples.
pub trait Trainer {
    fn train(
        &self,
        transformed: &TransformOutput,
        schema: &Schema,
    ) -> Result<TrainedModel, CollaboratorError>;
}

/// Computes sliced evaluation metrics for one model over the eval split.
/// Called once for the candidate and, when a baseline exists, once for it.
pub trait Evaluator {
    fn evaluate(
        &self,
        examples: &ExampleSet,
        model: &ModelArtifact,
    ) -> Result<EvaluationResult, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyGen;

    impl ExampleGen for EmptyGen {
        fn generate(
            &self,
            _data_dir: &str,
            _splits: &SplitConfig,
        ) -> Result<ExampleSet, CollaboratorError> {
            Ok(ExampleSet::default())
        }
    }

    #[test]
    fn example_gen_is_object_safe_via_box() {
        let gen: Box<dyn ExampleGen> = Box::new(EmptyGen);
        let set = gen.generate("data", &SplitConfig::default()).unwrap();
        assert_eq!(set.total_examples(), 0);
    }

    #[test]
    fn collaborator_error_displays_message() {
        let err = CollaboratorError::new("upstream exploded");
        assert_eq!(err.to_string(), "upstream exploded");
    }
}
