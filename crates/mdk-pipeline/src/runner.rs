//! Sequential pipeline runner.
//!
//! One run walks ingestion -> statistics -> schema -> validation ->
//! transform -> train -> evaluate -> gate -> push, recording every stage's
//! artifact in the run directory before the next stage starts. Any stage
//! failure aborts the run: the gate is never invoked and no model artifact
//! changes blessing status.

use std::fmt;
use std::path::PathBuf;

use mdk_artifacts::{
    init_run_artifacts, write_stage_artifact, DecisionReport, InitRunArtifactsArgs, PushError,
    Pusher,
};
use mdk_config::PipelineConfig;
use mdk_gate::Decision;
use mdk_registry::{ModelRegistry, RegistryError};
use mdk_schemas::{EvaluationResult, ModelArtifact, PushRecord};
use uuid::Uuid;

use crate::contracts::Anomaly;
use crate::stages::{
    CollaboratorError, Evaluator, ExampleGen, ExampleValidator, SchemaGen, StatisticsGen, Trainer,
    Transform,
};

const MANIFEST_SCHEMA_VERSION: i32 = 1;

// ---------------------------------------------------------------------------
// Stage names
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageName {
    ExampleGen,
    StatisticsGen,
    SchemaGen,
    ExampleValidator,
    Transform,
    Trainer,
    Evaluator,
    Gate,
    Push,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::ExampleGen => "example_gen",
            StageName::StatisticsGen => "statistics_gen",
            StageName::SchemaGen => "schema_gen",
            StageName::ExampleValidator => "example_validator",
            StageName::Transform => "transform",
            StageName::Trainer => "trainer",
            StageName::Evaluator => "evaluator",
            StageName::Gate => "gate",
            StageName::Push => "push",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum PipelineError {
    /// Run-directory initialization failed before any stage ran.
    Init { message: String },
    /// An external collaborator failed; the run stops at that stage.
    Stage {
        stage: StageName,
        source: CollaboratorError,
    },
    /// The validator reported at least one blocking anomaly.
    Validation { anomalies: Vec<Anomaly> },
    /// Run-directory or stage-artifact recording failed.
    Artifacts { stage: StageName, message: String },
    Registry(RegistryError),
    Push(PushError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Init { message } => {
                write!(f, "run initialization failed: {message}")
            }
            PipelineError::Stage { stage, source } => {
                write!(f, "stage {stage} failed: {source}")
            }
            PipelineError::Validation { anomalies } => {
                let blocking: Vec<&str> = anomalies
                    .iter()
                    .filter(|a| a.blocking)
                    .map(|a| a.feature.as_str())
                    .collect();
                write!(f, "validation found blocking anomalies on: {blocking:?}")
            }
            PipelineError::Artifacts { stage, message } => {
                write!(f, "artifact recording failed after stage {stage}: {message}")
            }
            PipelineError::Registry(e) => write!(f, "{e}"),
            PipelineError::Push(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Stage { source, .. } => Some(source),
            PipelineError::Registry(e) => Some(e),
            PipelineError::Push(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RegistryError> for PipelineError {
    fn from(e: RegistryError) -> Self {
        PipelineError::Registry(e)
    }
}

impl From<PushError> for PipelineError {
    fn from(e: PushError) -> Self {
        PipelineError::Push(e)
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// The black-box stage implementations a run is wired with.
pub struct Collaborators {
    pub example_gen: Box<dyn ExampleGen>,
    pub statistics_gen: Box<dyn StatisticsGen>,
    pub schema_gen: Box<dyn SchemaGen>,
    pub example_validator: Box<dyn ExampleValidator>,
    pub transform: Box<dyn Transform>,
    pub trainer: Box<dyn Trainer>,
    pub evaluator: Box<dyn Evaluator>,
}

/// Outcome of one completed run (the gate decided, whatever it decided).
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub run_dir: PathBuf,
    /// Candidate artifact after the blessing transition.
    pub candidate: ModelArtifact,
    pub baseline_id: Option<Uuid>,
    pub decision: Decision,
    /// Present iff the candidate was blessed and exported.
    pub push: Option<PushRecord>,
}

pub struct PipelineRunner {
    config: PipelineConfig,
    collaborators: Collaborators,
    registry: Box<dyn ModelRegistry>,
    pusher: Box<dyn Pusher>,
}

impl PipelineRunner {
    pub fn new(
        config: PipelineConfig,
        collaborators: Collaborators,
        registry: Box<dyn ModelRegistry>,
        pusher: Box<dyn Pusher>,
    ) -> Self {
        Self {
            config,
            collaborators,
            registry,
            pusher,
        }
    }

    pub fn registry(&self) -> &dyn ModelRegistry {
        self.registry.as_ref()
    }

    /// Execute one pipeline run with a fresh run id.
    pub fn run(&self) -> Result<RunSummary, PipelineError> {
        self.run_with_id(Uuid::new_v4())
    }

    pub fn run_with_id(&self, run_id: Uuid) -> Result<RunSummary, PipelineError> {
        let span = tracing::info_span!(
            "pipeline_run",
            run_id = %run_id,
            pipeline = %self.config.pipeline.name
        );
        let _guard = span.enter();

        let init = init_run_artifacts(InitRunArtifactsArgs {
            artifacts_root: std::path::Path::new(&self.config.pipeline.artifacts_root),
            schema_version: MANIFEST_SCHEMA_VERSION,
            run_id,
            pipeline_name: &self.config.pipeline.name,
            config_hash: &self.config.config_hash,
        })
        .map_err(|e| PipelineError::Init {
            message: format!("{e:#}"),
        })?;
        let run_dir = init.run_dir;

        // --- ingestion ---
        tracing::info!(stage = %StageName::ExampleGen, "stage start");
        let examples = self
            .collaborators
            .example_gen
            .generate(&self.config.pipeline.data_dir, &self.config.pipeline.splits)
            .map_err(|source| PipelineError::Stage {
                stage: StageName::ExampleGen,
                source,
            })?;
        self.record(&run_dir, StageName::ExampleGen, "example_set.json", &examples)?;

        // --- statistics ---
        tracing::info!(stage = %StageName::StatisticsGen, "stage start");
        let statistics = self
            .collaborators
            .statistics_gen
            .compute(&examples)
            .map_err(|source| PipelineError::Stage {
                stage: StageName::StatisticsGen,
                source,
            })?;
        self.record(&run_dir, StageName::StatisticsGen, "statistics.json", &statistics)?;

        // --- schema ---
        tracing::info!(stage = %StageName::SchemaGen, "stage start");
        let schema = self
            .collaborators
            .schema_gen
            .infer(&statistics)
            .map_err(|source| PipelineError::Stage {
                stage: StageName::SchemaGen,
                source,
            })?;
        self.record(&run_dir, StageName::SchemaGen, "schema.json", &schema)?;

        // --- validation ---
        tracing::info!(stage = %StageName::ExampleValidator, "stage start");
        let validation = self
            .collaborators
            .example_validator
            .validate(&statistics, &schema)
            .map_err(|source| PipelineError::Stage {
                stage: StageName::ExampleValidator,
                source,
            })?;
        self.record(&run_dir, StageName::ExampleValidator, "validation.json", &validation)?;
        if validation.has_blocking() {
            return Err(PipelineError::Validation {
                anomalies: validation.anomalies,
            });
        }

        // --- transform ---
        tracing::info!(stage = %StageName::Transform, "stage start");
        let transformed = self
            .collaborators
            .transform
            .apply(&examples, &schema)
            .map_err(|source| PipelineError::Stage {
                stage: StageName::Transform,
                source,
            })?;
        self.record(&run_dir, StageName::Transform, "transform.json", &transformed)?;

        // --- training ---
        tracing::info!(stage = %StageName::Trainer, "stage start");
        let trained = self
            .collaborators
            .trainer
            .train(&transformed, &schema)
            .map_err(|source| PipelineError::Stage {
                stage: StageName::Trainer,
                source,
            })?;
        self.registry.store(&trained.artifact)?;
        self.record(&run_dir, StageName::Trainer, "trained_model.json", &trained)?;

        // --- baseline resolution + evaluation ---
        let baseline_artifact = self
            .registry
            .find_latest_blessed(&self.config.pipeline.name)?;
        let baseline_id = baseline_artifact.as_ref().map(|a| a.id);
        tracing::info!(
            stage = %StageName::Evaluator,
            baseline = ?baseline_id,
            "stage start"
        );

        let candidate_eval = self
            .collaborators
            .evaluator
            .evaluate(&examples, &trained.artifact)
            .map_err(|source| PipelineError::Stage {
                stage: StageName::Evaluator,
                source,
            })?;
        self.record(&run_dir, StageName::Evaluator, "evaluation.json", &candidate_eval)?;

        let baseline_eval: Option<EvaluationResult> = match &baseline_artifact {
            None => None,
            Some(baseline) => Some(
                self.collaborators
                    .evaluator
                    .evaluate(&examples, baseline)
                    .map_err(|source| PipelineError::Stage {
                        stage: StageName::Evaluator,
                        source,
                    })?,
            ),
        };

        // --- gate ---
        let decision = mdk_gate::evaluate(&self.config.gate, &candidate_eval, baseline_eval.as_ref());
        let (pass, fail, skipped) = decision.counts();
        tracing::info!(
            stage = %StageName::Gate,
            blessed = decision.blessed,
            pass,
            fail,
            skipped,
            "gate decision"
        );

        let report = DecisionReport {
            spec: self.config.gate.clone(),
            candidate_id: trained.artifact.id,
            baseline_id,
            decision: decision.clone(),
        };
        mdk_artifacts::write_decision_report_json(&run_dir, &report).map_err(|e| {
            PipelineError::Artifacts {
                stage: StageName::Gate,
                message: format!("{e:#}"),
            }
        })?;

        let candidate = self
            .registry
            .record_decision(trained.artifact.id, decision.blessed)?;

        // --- push (blessed only) ---
        let push = if decision.blessed {
            tracing::info!(stage = %StageName::Push, model = %candidate.id, "pushing blessed model");
            let record = self
                .pusher
                .push(&candidate, &self.config.pipeline.serving_dir)?;
            self.record(&run_dir, StageName::Push, "push_record.json", &record)?;
            Some(record)
        } else {
            tracing::info!(stage = %StageName::Push, "candidate rejected, push skipped");
            None
        };

        Ok(RunSummary {
            run_id,
            run_dir,
            candidate,
            baseline_id,
            decision,
            push,
        })
    }

    fn record<T: serde::Serialize>(
        &self,
        run_dir: &std::path::Path,
        stage: StageName,
        file_name: &str,
        artifact: &T,
    ) -> Result<(), PipelineError> {
        write_stage_artifact(run_dir, file_name, artifact).map_err(|e| {
            PipelineError::Artifacts {
                stage,
                message: format!("{e:#}"),
            }
        })?;
        Ok(())
    }
}
