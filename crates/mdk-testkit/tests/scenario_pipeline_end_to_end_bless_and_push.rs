//! Cold-start pipeline run, end to end and green.
//!
//! GREEN when:
//! - All stages run in order and each artifact lands in the run directory.
//! - With no baseline, the candidate passes its value thresholds, change
//!   thresholds SKIP, and the model is blessed.
//! - The blessed model is exported to the serving dir and the registry
//!   reports it as latest-blessed.

use mdk_artifacts::FilesystemPusher;
use mdk_pipeline::{Collaborators, PipelineRunner};
use mdk_registry::{FileRegistry, ModelRegistry};
use mdk_schemas::BlessingStatus;
use mdk_testkit::{
    churn_example_set, overall_metrics, temp_workspace, test_config, CleanValidator,
    CountingStatisticsGen, FixedEvaluator, IdentityTransform, InferredSchemaGen, StaticExampleGen,
    TempDirTrainer,
};

const GATE_YAML: &str = r#"  slices:
    - slice: {}
      thresholds:
        - kind: value
          metric: "BinaryAccuracy"
          lower_bound: 0.5
        - kind: change
          metric: "BinaryAccuracy"
          direction: HIGHER_IS_BETTER
          absolute: 0.0001
"#;

#[test]
fn cold_start_run_blesses_and_pushes() {
    let root = temp_workspace("bless");
    let config = test_config(&root, GATE_YAML);

    let registry = FileRegistry::open(&config.pipeline.registry_root).unwrap();
    let collaborators = Collaborators {
        example_gen: Box::new(StaticExampleGen {
            set: churn_example_set(),
        }),
        statistics_gen: Box::new(CountingStatisticsGen),
        schema_gen: Box::new(InferredSchemaGen),
        example_validator: Box::new(CleanValidator),
        transform: Box::new(IdentityTransform),
        trainer: Box::new(TempDirTrainer {
            models_dir: root.join("models"),
        }),
        evaluator: Box::new(FixedEvaluator {
            metrics: overall_metrics(&[("BinaryAccuracy", 0.91), ("AUC", 0.88)]),
        }),
    };

    let serving_dir = config.pipeline.serving_dir.clone();
    let runner = PipelineRunner::new(
        config,
        collaborators,
        Box::new(registry),
        Box::new(FilesystemPusher),
    );

    let summary = runner.run().unwrap();

    assert!(summary.decision.blessed);
    assert_eq!(summary.baseline_id, None, "cold start has no baseline");
    assert_eq!(summary.candidate.blessing, BlessingStatus::Blessed);

    // Change threshold skipped, value threshold passed.
    assert_eq!(summary.decision.counts(), (1, 0, 1));

    // Every stage artifact was durably recorded.
    for name in [
        "manifest.json",
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
        assert!(summary.run_dir.join(name).exists(), "missing artifact {name}");
    }

    // The push actually exported the model tree.
    let push = summary.push.as_ref().expect("blessed model must be pushed");
    assert!(push.destination.starts_with(&serving_dir));
    assert!(std::path::Path::new(&push.destination)
        .join("saved_model.bin")
        .exists());

    // A fresh registry handle sees the blessed candidate as latest.
    let registry = FileRegistry::open(root.join("registry")).unwrap();
    let latest = registry.find_latest_blessed("customer-churn").unwrap().unwrap();
    assert_eq!(latest.id, summary.candidate.id);

    std::fs::remove_dir_all(&root).ok();
}
