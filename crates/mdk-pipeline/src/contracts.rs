//! Artifact contracts between pipeline stages.
//!
//! Every stage's output is one of these serde documents; the runner records
//! it in the run directory before the next stage starts. The numerical work
//! that fills them in belongs to external collaborators — only the shape of
//! the hand-off is fixed here.

use std::collections::BTreeMap;

use mdk_schemas::ModelArtifact;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Examples
// ---------------------------------------------------------------------------

/// One raw labeled example: column name -> raw value, as ingested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub fields: BTreeMap<String, String>,
}

impl Example {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// The labeled example set, partitioned into named splits
/// (conventionally `"train"` and `"eval"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleSet {
    pub splits: BTreeMap<String, Vec<Example>>,
}

impl ExampleSet {
    pub fn split(&self, name: &str) -> &[Example] {
        self.splits.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total_examples(&self) -> usize {
        self.splits.values().map(Vec::len).sum()
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureStatistics {
    /// Examples carrying a non-empty value for the feature.
    pub present: usize,
    pub missing: usize,
    pub distinct_values: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitStatistics {
    pub example_count: usize,
    pub features: BTreeMap<String, FeatureStatistics>,
}

/// Descriptive statistics per split, produced by the statistics collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub per_split: BTreeMap<String, SplitStatistics>,
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    /// Required features trigger a blocking anomaly when missing from a batch.
    pub required: bool,
}

/// Inferred feature schema used to validate new data batches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub features: Vec<FeatureSpec>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    pub feature: String,
    pub description: String,
    /// Blocking anomalies abort the run before training.
    pub blocking: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub anomalies: Vec<Anomaly>,
}

impl ValidationReport {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn has_blocking(&self) -> bool {
        self.anomalies.iter().any(|a| a.blocking)
    }
}

// ---------------------------------------------------------------------------
// Transform / training
// ---------------------------------------------------------------------------

/// Transform output: the feature-engineered example set plus a reference to
/// the reusable transformation graph (applied identically at serving time).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOutput {
    pub example_set: ExampleSet,
    pub transform_graph_uri: String,
}

/// The trainer's hand-off: a freshly created, UNBLESSED model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub artifact: ModelArtifact,
}
