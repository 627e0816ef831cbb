//! Typed view over the merged configuration document.
//!
//! A [`PipelineConfig`] is constructed once per run from a [`LoadedConfig`]
//! and is immutable afterwards; stages receive references, never the raw
//! JSON. The gate spec is validated structurally at construction so a
//! malformed threshold never reaches the gate.

use anyhow::{Context, Result};
use mdk_gate::GateSpec;
use serde::{Deserialize, Serialize};

use crate::LoadedConfig;

/// Split configuration for example generation.
///
/// Matches the original hash-bucket split: an example lands in `train` when
/// `hash(example) % (train + eval) < train`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitConfig {
    #[serde(default = "default_train_buckets")]
    pub train_hash_buckets: u32,
    #[serde(default = "default_eval_buckets")]
    pub eval_hash_buckets: u32,
}

fn default_train_buckets() -> u32 {
    8
}

fn default_eval_buckets() -> u32 {
    2
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_hash_buckets: default_train_buckets(),
            eval_hash_buckets: default_eval_buckets(),
        }
    }
}

/// Static pipeline definition: names, locations, split ratios.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Pipeline identifier, used as run-manifest pipeline_name.
    pub name: String,
    /// Directory of raw input data.
    pub data_dir: String,
    /// Root under which per-run artifact directories are created.
    #[serde(default = "default_artifacts_root")]
    pub artifacts_root: String,
    /// Root of the file-backed model registry.
    #[serde(default = "default_registry_root")]
    pub registry_root: String,
    /// Destination directory blessed models are pushed to.
    #[serde(default = "default_serving_dir")]
    pub serving_dir: String,
    /// Name of the label column, e.g. "Churn".
    pub label_key: String,
    #[serde(default)]
    pub splits: SplitConfig,
}

fn default_artifacts_root() -> String {
    "output/artifacts".to_string()
}

fn default_registry_root() -> String {
    "output/registry".to_string()
}

fn default_serving_dir() -> String {
    "output/serving".to_string()
}

/// The complete, validated run configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub pipeline: PipelineSpec,
    pub gate: GateSpec,
    /// SHA-256 over the canonical merged document; recorded in the run
    /// manifest so a run is traceable to the exact config it saw.
    pub config_hash: String,
}

impl PipelineConfig {
    /// Extract the typed config from a merged document.
    ///
    /// Expects a `pipeline:` section and a `gate:` section; the gate spec is
    /// structurally validated (every threshold must carry at least one
    /// usable bound).
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        let pipeline_value = loaded
            .config_json
            .pointer("/pipeline")
            .context("config missing 'pipeline' section")?;
        let pipeline: PipelineSpec = serde_json::from_value(pipeline_value.clone())
            .context("invalid 'pipeline' section")?;

        let gate_value = loaded
            .config_json
            .pointer("/gate")
            .context("config missing 'gate' section")?;
        let gate: GateSpec =
            serde_json::from_value(gate_value.clone()).context("invalid 'gate' section")?;
        gate.validate()
            .context("gate spec failed structural validation")?;

        Ok(Self {
            pipeline,
            gate,
            config_hash: loaded.config_hash.clone(),
        })
    }
}
