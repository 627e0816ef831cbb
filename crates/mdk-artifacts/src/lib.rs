use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use mdk_gate::{Decision, GateSpec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

mod push;

pub use push::{FilesystemPusher, PushError, Pusher};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: i32,
    pub run_id: Uuid,
    pub pipeline_name: String,
    pub config_hash: String,
    pub created_at_utc: DateTime<Utc>,
    pub artifacts: ArtifactList,
}

/// File names of the per-stage artifacts inside a run directory. Each stage's
/// output is written here before the next stage starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactList {
    pub manifest_json: String,
    pub example_set_json: String,
    pub statistics_json: String,
    pub schema_json: String,
    pub validation_json: String,
    pub transform_json: String,
    pub trained_model_json: String,
    pub evaluation_json: String,
    pub decision_report_json: String,
    pub push_record_json: String,
}

impl ArtifactList {
    fn standard() -> Self {
        Self {
            manifest_json: "manifest.json".to_string(),
            example_set_json: "example_set.json".to_string(),
            statistics_json: "statistics.json".to_string(),
            schema_json: "schema.json".to_string(),
            validation_json: "validation.json".to_string(),
            transform_json: "transform.json".to_string(),
            trained_model_json: "trained_model.json".to_string(),
            evaluation_json: "evaluation.json".to_string(),
            decision_report_json: "decision_report.json".to_string(),
            push_record_json: "push_record.json".to_string(),
        }
    }
}

pub struct InitRunArtifactsArgs<'a> {
    /// e.g. output/customer-churn/artifacts
    pub artifacts_root: &'a Path,
    pub schema_version: i32,
    pub run_id: Uuid,
    pub pipeline_name: &'a str,
    pub config_hash: &'a str,
}

pub struct InitRunArtifactsResult {
    pub run_dir: PathBuf,
    pub manifest_path: PathBuf,
}

/// Create `<artifacts_root>/<run_id>/` with placeholder artifact files and a
/// manifest. Placeholders are only created when missing; the manifest is
/// overwritten (it is deterministic for a run start).
pub fn init_run_artifacts(args: InitRunArtifactsArgs<'_>) -> Result<InitRunArtifactsResult> {
    let run_dir = args.artifacts_root.join(args.run_id.to_string());
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("create run dir failed: {}", run_dir.display()))?;

    let artifacts = ArtifactList::standard();
    for name in [
        &artifacts.example_set_json,
        &artifacts.statistics_json,
        &artifacts.schema_json,
        &artifacts.validation_json,
        &artifacts.transform_json,
        &artifacts.trained_model_json,
        &artifacts.evaluation_json,
        &artifacts.decision_report_json,
        &artifacts.push_record_json,
    ] {
        ensure_file_exists_with(&run_dir.join(name), "{}\n")?;
    }

    let manifest = RunManifest {
        schema_version: args.schema_version,
        run_id: args.run_id,
        pipeline_name: args.pipeline_name.to_string(),
        config_hash: args.config_hash.to_string(),
        created_at_utc: Utc::now(),
        artifacts,
    };

    let manifest_path = run_dir.join("manifest.json");
    let json = serde_json::to_string_pretty(&manifest).context("serialize manifest failed")?;
    fs::write(&manifest_path, format!("{json}\n"))
        .with_context(|| format!("write manifest failed: {}", manifest_path.display()))?;

    Ok(InitRunArtifactsResult {
        run_dir,
        manifest_path,
    })
}

fn ensure_file_exists_with(path: &Path, contents_if_create: &str) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    fs::write(path, contents_if_create)
        .with_context(|| format!("create placeholder failed: {}", path.display()))?;
    Ok(())
}

/// Durably record one stage's output as pretty-printed JSON in the run dir.
/// Returns the path written. The runner calls this before starting the next
/// stage.
pub fn write_stage_artifact<T: Serialize>(
    run_dir: &Path,
    file_name: &str,
    artifact: &T,
) -> Result<PathBuf> {
    let path = run_dir.join(file_name);
    let json = serde_json::to_string_pretty(artifact)
        .with_context(|| format!("serialize stage artifact failed: {file_name}"))?;
    fs::write(&path, format!("{json}\n"))
        .with_context(|| format!("write stage artifact failed: {}", path.display()))?;
    Ok(path)
}

/// Read back a stage artifact written by [`write_stage_artifact`].
pub fn read_stage_artifact<T: for<'de> Deserialize<'de>>(
    run_dir: &Path,
    file_name: &str,
) -> Result<T> {
    let path = run_dir.join(file_name);
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("read stage artifact failed: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parse stage artifact failed: {}", path.display()))
}

// ---------------------------------------------------------------------------
// Decision report
// ---------------------------------------------------------------------------

/// Full gate report artifact (serializable to JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionReport {
    pub spec: GateSpec,
    pub candidate_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_id: Option<Uuid>,
    pub decision: Decision,
}

/// Write the report as pretty-printed JSON to `run_dir/decision_report.json`.
/// Returns the path written.
pub fn write_decision_report_json(run_dir: &Path, report: &DecisionReport) -> Result<PathBuf> {
    write_stage_artifact(run_dir, "decision_report.json", report)
}
