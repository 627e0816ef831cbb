use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mdk_artifacts::DecisionReport;
use mdk_config::{load_layered_yaml, LoadedConfig};
use mdk_gate::{evaluate, Decision, GateSpec};
use mdk_registry::{FileRegistry, ModelRegistry};
use mdk_schemas::EvaluationResult;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "mdk")]
#[command(about = "ModelDesk pipeline CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> overrides)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Promotion gate commands
    Gate {
        #[command(subcommand)]
        cmd: GateCmd,
    },

    /// Model registry queries
    Registry {
        #[command(subcommand)]
        cmd: RegistryCmd,
    },
}

#[derive(Subcommand)]
enum GateCmd {
    /// Evaluate a candidate's metrics offline against a gate spec.
    Eval {
        /// Candidate EvaluationResult JSON file
        #[arg(long)]
        candidate: PathBuf,

        /// Baseline EvaluationResult JSON file (omit for cold start)
        #[arg(long)]
        baseline: Option<PathBuf>,

        /// Gate spec YAML paths in merge order (a full pipeline config or a
        /// document with a top-level `gate:` section)
        #[arg(long = "spec", required = true)]
        spec_paths: Vec<String>,

        /// Directory to write decision_report.json into
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum RegistryCmd {
    /// Print the currently serving (latest blessed) model, if any.
    LatestBlessed {
        /// Registry root directory
        #[arg(long)]
        root: PathBuf,

        /// Model name to resolve, e.g. "customer-churn"
        #[arg(long)]
        name: String,
    },

    /// Print one artifact row as JSON.
    Show {
        /// Registry root directory
        #[arg(long)]
        root: PathBuf,

        /// Model artifact id
        #[arg(long)]
        id: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::ConfigHash { paths } => cmd_config_hash(&paths),
        Commands::Gate { cmd } => match cmd {
            GateCmd::Eval {
                candidate,
                baseline,
                spec_paths,
                out,
            } => cmd_gate_eval(&candidate, baseline.as_deref(), &spec_paths, out.as_deref()),
        },
        Commands::Registry { cmd } => match cmd {
            RegistryCmd::LatestBlessed { root, name } => cmd_registry_latest(&root, &name),
            RegistryCmd::Show { root, id } => cmd_registry_show(&root, &id),
        },
    }
}

fn cmd_config_hash(paths: &[String]) -> Result<()> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = load_layered_yaml(&path_refs)?;
    println!("config_hash={}", loaded.config_hash);
    println!("{}", loaded.canonical_json);
    Ok(())
}

fn cmd_gate_eval(
    candidate_path: &Path,
    baseline_path: Option<&Path>,
    spec_paths: &[String],
    out: Option<&Path>,
) -> Result<()> {
    let path_refs: Vec<&str> = spec_paths.iter().map(|s| s.as_str()).collect();
    let loaded = load_layered_yaml(&path_refs)?;
    let spec = extract_gate_spec(&loaded)?;

    let candidate = read_evaluation_result(candidate_path)?;
    let baseline = baseline_path.map(read_evaluation_result).transpose()?;

    let decision = evaluate(&spec, &candidate, baseline.as_ref());
    print_decision(&decision);

    if let Some(out_dir) = out {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("create out dir failed: {}", out_dir.display()))?;
        let report = DecisionReport {
            spec,
            candidate_id: candidate.model_id,
            baseline_id: baseline.as_ref().map(|b| b.model_id),
            decision,
        };
        let path = mdk_artifacts::write_decision_report_json(out_dir, &report)?;
        println!("report={}", path.display());
    }

    Ok(())
}

/// Accepts either a full pipeline config (with a `gate:` section) or a bare
/// gate spec document, and validates it structurally.
fn extract_gate_spec(loaded: &LoadedConfig) -> Result<GateSpec> {
    let value = loaded
        .config_json
        .pointer("/gate")
        .unwrap_or(&loaded.config_json);
    let spec: GateSpec =
        serde_json::from_value(value.clone()).context("invalid gate spec document")?;
    spec.validate().context("gate spec failed validation")?;
    Ok(spec)
}

fn read_evaluation_result(path: &Path) -> Result<EvaluationResult> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read evaluation result: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid evaluation result json: {}", path.display()))
}

fn print_decision(decision: &Decision) {
    let (pass, fail, skipped) = decision.counts();
    println!(
        "decision={} pass={pass} fail={fail} skipped={skipped}",
        if decision.blessed { "BLESSED" } else { "REJECTED" }
    );
    for reason in decision.fail_reasons() {
        println!("fail: {reason}");
    }
}

fn cmd_registry_latest(root: &Path, name: &str) -> Result<()> {
    let registry = FileRegistry::open(root)?;
    match registry.find_latest_blessed(name)? {
        None => println!("latest_blessed=none"),
        Some(artifact) => {
            println!(
                "latest_blessed={} name={} created_at={} storage_uri={}",
                artifact.id, artifact.name, artifact.created_at, artifact.storage_uri
            );
        }
    }
    Ok(())
}

fn cmd_registry_show(root: &Path, id: &str) -> Result<()> {
    let id: Uuid = id.parse().context("invalid model id (expected a UUID)")?;
    let registry = FileRegistry::open(root)?;
    match registry.get(id)? {
        None => println!("model {id} not found"),
        Some(artifact) => {
            println!("{}", serde_json::to_string_pretty(&artifact)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdk_config::load_layered_yaml_from_strings;

    #[test]
    fn extract_gate_spec_accepts_full_config_and_bare_doc() {
        let full = r#"
pipeline:
  name: "x"
gate:
  slices:
    - slice: {}
      thresholds:
        - kind: value
          metric: "AUC"
          lower_bound: 0.5
"#;
        let bare = r#"
slices:
  - slice: {}
    thresholds:
      - kind: value
        metric: "AUC"
        lower_bound: 0.5
"#;
        let a = extract_gate_spec(&load_layered_yaml_from_strings(&[full]).unwrap()).unwrap();
        let b = extract_gate_spec(&load_layered_yaml_from_strings(&[bare]).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn extract_gate_spec_rejects_boundless_threshold() {
        let bad = r#"
slices:
  - slice: {}
    thresholds:
      - kind: change
        metric: "AUC"
        direction: HIGHER_IS_BETTER
"#;
        let loaded = load_layered_yaml_from_strings(&[bad]).unwrap();
        assert!(extract_gate_spec(&loaded).is_err());
    }
}
