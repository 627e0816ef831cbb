mod contracts;
mod runner;
mod stages;

pub use contracts::{
    Anomaly, Example, ExampleSet, FeatureSpec, FeatureStatistics, Schema, SplitStatistics,
    Statistics, TrainedModel, TransformOutput, ValidationReport,
};
pub use runner::{Collaborators, PipelineError, PipelineRunner, RunSummary, StageName};
pub use stages::{
    CollaboratorError, Evaluator, ExampleGen, ExampleValidator, SchemaGen, StatisticsGen, Trainer,
    Transform,
};
