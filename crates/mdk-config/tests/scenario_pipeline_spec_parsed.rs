//! Typed extraction of the pipeline + gate spec from the merged document.
//!
//! GREEN when:
//! - A full config parses into PipelineConfig with the gate spec intact.
//! - Omitted keys fall back to documented defaults (8:2 buckets, output/ roots).
//! - A gate spec with an unusable threshold is rejected at construction.
//! - A config without a pipeline section is rejected.

use mdk_config::{load_layered_yaml_from_strings, PipelineConfig};
use mdk_gate::Threshold;
use mdk_schemas::SliceKey;

const FULL_YAML: &str = r#"
pipeline:
  name: "customer-churn"
  data_dir: "data"
  artifacts_root: "output/customer-churn/artifacts"
  registry_root: "output/customer-churn/registry"
  serving_dir: "output/customer-churn/serving"
  label_key: "Churn"
  splits:
    train_hash_buckets: 8
    eval_hash_buckets: 2
gate:
  slices:
    - slice: {}
      thresholds:
        - kind: value
          metric: "BinaryAccuracy"
          lower_bound: 0.5
        - kind: change
          metric: "BinaryAccuracy"
          direction: HIGHER_IS_BETTER
          absolute: 0.0001
    - slice: { gender: "Male" }
      thresholds:
        - kind: value
          metric: "BinaryAccuracy"
          lower_bound: 0.5
"#;

const MINIMAL_YAML: &str = r#"
pipeline:
  name: "customer-churn"
  data_dir: "data"
  label_key: "Churn"
gate:
  slices:
    - slice: {}
      thresholds:
        - kind: value
          metric: "AUC"
          lower_bound: 0.5
"#;

#[test]
fn full_config_parses_with_gate_spec_intact() {
    let loaded = load_layered_yaml_from_strings(&[FULL_YAML]).unwrap();
    let config = PipelineConfig::from_loaded(&loaded).unwrap();

    assert_eq!(config.pipeline.name, "customer-churn");
    assert_eq!(config.pipeline.label_key, "Churn");
    assert_eq!(config.pipeline.splits.train_hash_buckets, 8);
    assert_eq!(config.pipeline.splits.eval_hash_buckets, 2);
    assert_eq!(config.config_hash, loaded.config_hash);

    assert_eq!(config.gate.slices.len(), 2);
    assert_eq!(config.gate.slices[0].slice, SliceKey::overall());
    assert_eq!(
        config.gate.slices[1].slice,
        SliceKey::from_pairs([("gender", "Male")])
    );

    match &config.gate.slices[0].thresholds[1] {
        Threshold::Change { metric, absolute, .. } => {
            assert_eq!(metric, "BinaryAccuracy");
            assert_eq!(*absolute, Some(0.0001));
        }
        other => panic!("expected change threshold, got {other:?}"),
    }
}

#[test]
fn omitted_keys_fall_back_to_defaults() {
    let loaded = load_layered_yaml_from_strings(&[MINIMAL_YAML]).unwrap();
    let config = PipelineConfig::from_loaded(&loaded).unwrap();

    assert_eq!(config.pipeline.artifacts_root, "output/artifacts");
    assert_eq!(config.pipeline.registry_root, "output/registry");
    assert_eq!(config.pipeline.serving_dir, "output/serving");
    assert_eq!(config.pipeline.splits.train_hash_buckets, 8);
    assert_eq!(config.pipeline.splits.eval_hash_buckets, 2);
}

#[test]
fn boundless_threshold_rejected_at_construction() {
    let bad = r#"
pipeline:
  name: "customer-churn"
  data_dir: "data"
  label_key: "Churn"
gate:
  slices:
    - slice: {}
      thresholds:
        - kind: change
          metric: "AUC"
          direction: HIGHER_IS_BETTER
"#;
    let loaded = load_layered_yaml_from_strings(&[bad]).unwrap();
    let err = PipelineConfig::from_loaded(&loaded).unwrap_err();
    assert!(
        format!("{err:#}").contains("validation"),
        "expected structural validation failure, got: {err:#}"
    );
}

#[test]
fn missing_pipeline_section_rejected() {
    let loaded = load_layered_yaml_from_strings(&["gate:\n  slices: []\n"]).unwrap();
    let err = PipelineConfig::from_loaded(&loaded).unwrap_err();
    assert!(format!("{err:#}").contains("pipeline"));
}
