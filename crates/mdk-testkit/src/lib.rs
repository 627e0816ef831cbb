//! Test support: deterministic stub collaborators and input builders for
//! pipeline scenario tests. Nothing here ships in production wiring; stubs
//! implement the real stage traits so scenarios exercise the actual runner,
//! gate, registry and pusher.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use chrono::Utc;
use mdk_config::{load_layered_yaml_from_strings, PipelineConfig, SplitConfig};
use mdk_pipeline::{
    Anomaly, CollaboratorError, Evaluator, Example, ExampleGen, ExampleSet, ExampleValidator,
    FeatureSpec, FeatureStatistics, Schema, SchemaGen, Statistics, StatisticsGen, SplitStatistics,
    TrainedModel, Trainer, Transform, TransformOutput, ValidationReport,
};
use mdk_schemas::{EvaluationResult, MetricValue, ModelArtifact, SliceKey};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Whole-dataset metric values from (name, value) pairs.
pub fn overall_metrics(pairs: &[(&str, f64)]) -> Vec<MetricValue> {
    pairs
        .iter()
        .map(|(name, value)| MetricValue {
            name: (*name).to_string(),
            value: *value,
            slice: SliceKey::overall(),
        })
        .collect()
}

/// A fresh temp workspace root for one scenario.
pub fn temp_workspace(tag: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!("mdk-scenario-{tag}-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&root).expect("create temp workspace");
    root
}

/// A small labeled churn-shaped example set with train/eval splits.
pub fn churn_example_set() -> ExampleSet {
    let mut set = ExampleSet::default();
    let rows = [
        ("Male", "Yes", "No"),
        ("Female", "No", "Yes"),
        ("Male", "No", "No"),
        ("Female", "Yes", "No"),
        ("Male", "Yes", "Yes"),
    ];
    let examples: Vec<Example> = rows
        .iter()
        .map(|(gender, partner, churn)| {
            Example::from_pairs([("gender", *gender), ("Partner", *partner), ("Churn", *churn)])
        })
        .collect();

    set.splits
        .insert("train".to_string(), examples[..4].to_vec());
    set.splits.insert("eval".to_string(), examples[4..].to_vec());
    set
}

/// Build a full validated [`PipelineConfig`] rooted at `root`, with the gate
/// section supplied as YAML (everything under `gate:`).
pub fn test_config(root: &Path, gate_yaml: &str) -> PipelineConfig {
    let root = root.display();
    let yaml = format!(
        r#"
pipeline:
  name: "customer-churn"
  data_dir: "{root}/data"
  artifacts_root: "{root}/artifacts"
  registry_root: "{root}/registry"
  serving_dir: "{root}/serving"
  label_key: "Churn"
gate:
{gate_yaml}
"#
    );
    let loaded = load_layered_yaml_from_strings(&[&yaml]).expect("test config yaml");
    PipelineConfig::from_loaded(&loaded).expect("test config parse")
}

// ---------------------------------------------------------------------------
// Stage stubs
// ---------------------------------------------------------------------------

/// Returns a pre-built example set, ignoring the data dir.
pub struct StaticExampleGen {
    pub set: ExampleSet,
}

impl ExampleGen for StaticExampleGen {
    fn generate(
        &self,
        _data_dir: &str,
        _splits: &SplitConfig,
    ) -> Result<ExampleSet, CollaboratorError> {
        Ok(self.set.clone())
    }
}

/// Counts rows and per-feature presence. Deterministic over its input.
pub struct CountingStatisticsGen;

impl StatisticsGen for CountingStatisticsGen {
    fn compute(&self, examples: &ExampleSet) -> Result<Statistics, CollaboratorError> {
        let mut stats = Statistics::default();
        for (split, rows) in &examples.splits {
            let mut split_stats = SplitStatistics {
                example_count: rows.len(),
                ..SplitStatistics::default()
            };
            for row in rows {
                for (feature, value) in &row.fields {
                    let entry = split_stats
                        .features
                        .entry(feature.clone())
                        .or_insert_with(FeatureStatistics::default);
                    if value.is_empty() {
                        entry.missing += 1;
                    } else {
                        entry.present += 1;
                    }
                }
            }
            for feature_stats in split_stats.features.values_mut() {
                // Stub simplification: distinct counting is not needed by any
                // scenario; presence/missing drive the validator.
                feature_stats.distinct_values = feature_stats.present.min(1);
            }
            stats.per_split.insert(split.clone(), split_stats);
        }
        Ok(stats)
    }
}

/// Declares every feature seen in the statistics, required when never missing.
pub struct InferredSchemaGen;

impl SchemaGen for InferredSchemaGen {
    fn infer(&self, statistics: &Statistics) -> Result<Schema, CollaboratorError> {
        let mut features: Vec<FeatureSpec> = Vec::new();
        for split_stats in statistics.per_split.values() {
            for (name, fs) in &split_stats.features {
                if !features.iter().any(|f| f.name == *name) {
                    features.push(FeatureSpec {
                        name: name.clone(),
                        required: fs.missing == 0,
                    });
                }
            }
        }
        features.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Schema { features })
    }
}

/// Always reports a clean batch.
pub struct CleanValidator;

impl ExampleValidator for CleanValidator {
    fn validate(
        &self,
        _statistics: &Statistics,
        _schema: &Schema,
    ) -> Result<ValidationReport, CollaboratorError> {
        Ok(ValidationReport::clean())
    }
}

/// Reports the configured anomalies unconditionally.
pub struct AnomalyValidator {
    pub anomalies: Vec<Anomaly>,
}

impl ExampleValidator for AnomalyValidator {
    fn validate(
        &self,
        _statistics: &Statistics,
        _schema: &Schema,
    ) -> Result<ValidationReport, CollaboratorError> {
        Ok(ValidationReport {
            anomalies: self.anomalies.clone(),
        })
    }
}

/// Passes the raw examples through unchanged.
pub struct IdentityTransform;

impl Transform for IdentityTransform {
    fn apply(
        &self,
        examples: &ExampleSet,
        _schema: &Schema,
    ) -> Result<TransformOutput, CollaboratorError> {
        Ok(TransformOutput {
            example_set: examples.clone(),
            transform_graph_uri: "transform/identity".to_string(),
        })
    }
}

/// Writes a one-file model tree under `models_dir` and hands back a fresh
/// UNBLESSED artifact pointing at it, so the filesystem pusher has real bytes
/// to export.
pub struct TempDirTrainer {
    pub models_dir: PathBuf,
}

impl Trainer for TempDirTrainer {
    fn train(
        &self,
        _transformed: &TransformOutput,
        _schema: &Schema,
    ) -> Result<TrainedModel, CollaboratorError> {
        let artifact = ModelArtifact::new("customer-churn", Utc::now(), "");
        let model_dir = self.models_dir.join(artifact.id.to_string());
        std::fs::create_dir_all(&model_dir)
            .map_err(|e| CollaboratorError::new(format!("create model dir: {e}")))?;
        std::fs::write(model_dir.join("saved_model.bin"), b"stub-weights")
            .map_err(|e| CollaboratorError::new(format!("write model: {e}")))?;

        let artifact = ModelArtifact {
            storage_uri: model_dir.to_string_lossy().into_owned(),
            ..artifact
        };
        Ok(TrainedModel { artifact })
    }
}

/// Fails with the configured message.
pub struct FailingTrainer {
    pub message: String,
}

impl Trainer for FailingTrainer {
    fn train(
        &self,
        _transformed: &TransformOutput,
        _schema: &Schema,
    ) -> Result<TrainedModel, CollaboratorError> {
        Err(CollaboratorError::new(self.message.clone()))
    }
}

/// Returns the same metric set for every model it is asked about.
pub struct FixedEvaluator {
    pub metrics: Vec<MetricValue>,
}

impl Evaluator for FixedEvaluator {
    fn evaluate(
        &self,
        _examples: &ExampleSet,
        model: &ModelArtifact,
    ) -> Result<EvaluationResult, CollaboratorError> {
        Ok(EvaluationResult::new(model.id, self.metrics.clone()))
    }
}

/// Pops one queued metric set per call, in call order. The runner evaluates
/// the candidate first, then the baseline (when one exists).
pub struct QueuedEvaluator {
    queue: RefCell<VecDeque<Vec<MetricValue>>>,
}

impl QueuedEvaluator {
    pub fn new(sets: Vec<Vec<MetricValue>>) -> Self {
        Self {
            queue: RefCell::new(sets.into()),
        }
    }
}

impl Evaluator for QueuedEvaluator {
    fn evaluate(
        &self,
        _examples: &ExampleSet,
        model: &ModelArtifact,
    ) -> Result<EvaluationResult, CollaboratorError> {
        let metrics = self
            .queue
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| CollaboratorError::new("QueuedEvaluator ran out of metric sets"))?;
        Ok(EvaluationResult::new(model.id, metrics))
    }
}
