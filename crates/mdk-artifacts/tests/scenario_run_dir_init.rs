//! Run directory initialization and stage-artifact recording.
//!
//! GREEN when:
//! - init_run_artifacts creates the run dir, all placeholder files, and a
//!   manifest carrying the config hash.
//! - Existing placeholder files are never overwritten.
//! - write_stage_artifact / read_stage_artifact round-trip a stage output.

use mdk_artifacts::{
    init_run_artifacts, read_stage_artifact, write_stage_artifact, InitRunArtifactsArgs,
    RunManifest,
};
use uuid::Uuid;

fn temp_root(tag: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("mdk-artifacts-{tag}-{}", Uuid::new_v4()))
}

#[test]
fn init_creates_run_dir_placeholders_and_manifest() {
    let root = temp_root("init");
    let run_id = Uuid::new_v4();

    let result = init_run_artifacts(InitRunArtifactsArgs {
        artifacts_root: &root,
        schema_version: 1,
        run_id,
        pipeline_name: "customer-churn",
        config_hash: "deadbeef",
    })
    .unwrap();

    assert_eq!(result.run_dir, root.join(run_id.to_string()));
    for name in [
        "example_set.json",
        "statistics.json",
        "schema.json",
        "validation.json",
        "transform.json",
        "trained_model.json",
        "evaluation.json",
        "decision_report.json",
        "push_record.json",
    ] {
        assert!(
            result.run_dir.join(name).exists(),
            "placeholder {name} must exist"
        );
    }

    let raw = std::fs::read_to_string(&result.manifest_path).unwrap();
    let manifest: RunManifest = serde_json::from_str(&raw).unwrap();
    assert_eq!(manifest.run_id, run_id);
    assert_eq!(manifest.pipeline_name, "customer-churn");
    assert_eq!(manifest.config_hash, "deadbeef");

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn init_does_not_overwrite_existing_placeholders() {
    let root = temp_root("keep");
    let run_id = Uuid::new_v4();
    let run_dir = root.join(run_id.to_string());
    std::fs::create_dir_all(&run_dir).unwrap();
    std::fs::write(run_dir.join("evaluation.json"), "{\"model_id\":\"x\"}\n").unwrap();

    init_run_artifacts(InitRunArtifactsArgs {
        artifacts_root: &root,
        schema_version: 1,
        run_id,
        pipeline_name: "customer-churn",
        config_hash: "deadbeef",
    })
    .unwrap();

    let kept = std::fs::read_to_string(run_dir.join("evaluation.json")).unwrap();
    assert_eq!(kept, "{\"model_id\":\"x\"}\n", "existing artifact must survive re-init");

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn stage_artifact_round_trips() {
    let root = temp_root("stage");
    std::fs::create_dir_all(&root).unwrap();

    #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
    struct Stats {
        rows: usize,
        columns: Vec<String>,
    }

    let stats = Stats {
        rows: 7043,
        columns: vec!["gender".into(), "Partner".into(), "Churn".into()],
    };
    write_stage_artifact(&root, "statistics.json", &stats).unwrap();
    let back: Stats = read_stage_artifact(&root, "statistics.json").unwrap();
    assert_eq!(back, stats);

    std::fs::remove_dir_all(&root).ok();
}
