//! Upstream trainer failure surfaces as a stage error; prior state survives.
//!
//! GREEN when:
//! - The failed run reports PipelineError::Stage{trainer}.
//! - The previously blessed model is still latest-blessed (no artifact
//!   transitioned) and the failed run's gate artifact is untouched.

use mdk_artifacts::FilesystemPusher;
use mdk_pipeline::{Collaborators, Evaluator, PipelineError, PipelineRunner, StageName, Trainer};
use mdk_registry::{FileRegistry, ModelRegistry};
use mdk_testkit::{
    churn_example_set, overall_metrics, temp_workspace, test_config, CleanValidator,
    CountingStatisticsGen, FailingTrainer, FixedEvaluator, IdentityTransform, InferredSchemaGen,
    StaticExampleGen, TempDirTrainer,
};
use uuid::Uuid;

const GATE_YAML: &str = r#"  slices:
    - slice: {}
      thresholds:
        - kind: value
          metric: "BinaryAccuracy"
          lower_bound: 0.5
"#;

fn runner_with(
    root: &std::path::Path,
    trainer: Box<dyn Trainer>,
    evaluator: Box<dyn Evaluator>,
) -> PipelineRunner {
    let config = test_config(root, GATE_YAML);
    let registry = FileRegistry::open(&config.pipeline.registry_root).unwrap();
    let collaborators = Collaborators {
        example_gen: Box::new(StaticExampleGen {
            set: churn_example_set(),
        }),
        statistics_gen: Box::new(CountingStatisticsGen),
        schema_gen: Box::new(InferredSchemaGen),
        example_validator: Box::new(CleanValidator),
        transform: Box::new(IdentityTransform),
        trainer,
        evaluator,
    };
    PipelineRunner::new(
        config,
        collaborators,
        Box::new(registry),
        Box::new(FilesystemPusher),
    )
}

#[test]
fn trainer_failure_surfaces_and_mutates_nothing() {
    let root = temp_workspace("trainer-fail");

    // Seed: one healthy run so a blessed model exists.
    let seeded = runner_with(
        &root,
        Box::new(TempDirTrainer {
            models_dir: root.join("models"),
        }),
        Box::new(FixedEvaluator {
            metrics: overall_metrics(&[("BinaryAccuracy", 0.90)]),
        }),
    )
    .run()
    .unwrap();
    assert!(seeded.decision.blessed);

    // Failing run.
    let run_id = Uuid::new_v4();
    let err = runner_with(
        &root,
        Box::new(FailingTrainer {
            message: "training job OOM-killed".into(),
        }),
        Box::new(FixedEvaluator {
            metrics: overall_metrics(&[("BinaryAccuracy", 0.95)]),
        }),
    )
    .run_with_id(run_id)
    .unwrap_err();

    match err {
        PipelineError::Stage { stage, source } => {
            assert_eq!(stage, StageName::Trainer);
            assert!(source.to_string().contains("OOM-killed"));
        }
        other => panic!("expected trainer stage error, got {other}"),
    }

    // The gate never ran for the failed attempt.
    let run_dir = root.join("artifacts").join(run_id.to_string());
    let report = std::fs::read_to_string(run_dir.join("decision_report.json")).unwrap();
    assert_eq!(report, "{}\n");

    // Prior state intact.
    let registry = FileRegistry::open(root.join("registry")).unwrap();
    let latest = registry.find_latest_blessed("customer-churn").unwrap().unwrap();
    assert_eq!(latest.id, seeded.candidate.id);

    std::fs::remove_dir_all(&root).ok();
}
