//! Operator CLI for the consolidation engine.
//!
//! Two commands: run one consolidation pass over a ledger snapshot file,
//! and check a policy document against the schema. Both read YAML or JSON
//! by file extension.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::debug;

use consolida_core::policy::validate_policy_schema;
use consolida_core::{
    ConsolidatedResult, ConsolidationEngine, ConsolidationOutcome, EvaluationRecord,
    EvaluatorId, SubmissionId, ValidatorConfig,
};

#[derive(Parser)]
#[command(name = "consolida", version, about = "Evaluation consolidation engine")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one consolidation pass over a ledger snapshot
    Consolidate {
        /// Validator policy document (YAML or JSON)
        #[arg(long)]
        policy: PathBuf,

        /// Ledger snapshot document (YAML or JSON)
        #[arg(long)]
        ledger: PathBuf,

        /// Print the outcome as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Check a policy document against the schema
    CheckPolicy {
        /// Policy document (YAML or JSON)
        file: PathBuf,
    },
}

/// A submission's ledger at one point in time, plus the trigger.
#[derive(Debug, Deserialize)]
struct LedgerSnapshot {
    submission: SubmissionId,

    /// Evaluator id of the validator evaluation that triggers the pass.
    trigger: EvaluatorId,

    /// Previously persisted consolidated value, if any.
    #[serde(default)]
    prior: Option<ConsolidatedResult>,

    evaluations: Vec<EvaluationRecord>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Consolidate {
            policy,
            ledger,
            json,
        } => consolidate(&policy, &ledger, json),
        Command::CheckPolicy { file } => check_policy(&file),
    }
}

fn consolidate(policy_path: &Path, ledger_path: &Path, json: bool) -> Result<()> {
    let config = load_policy(policy_path)?
        .with_env_required_validations()
        .context("Failed to read required validations from the environment")?;

    let snapshot: LedgerSnapshot = load_document(ledger_path)?;
    debug!(
        submission = %snapshot.submission,
        evaluations = snapshot.evaluations.len(),
        "ledger snapshot loaded"
    );

    let trigger = snapshot
        .evaluations
        .iter()
        .find(|e| e.evaluator.id() == &snapshot.trigger && e.is_submitted())
        .with_context(|| {
            format!(
                "No submitted evaluation by trigger '{}' in the snapshot",
                snapshot.trigger
            )
        })?;

    if trigger.submission != snapshot.submission {
        bail!(
            "Trigger evaluation belongs to submission '{}', snapshot is for '{}'",
            trigger.submission,
            snapshot.submission
        );
    }
    match trigger.evaluator.validator_group() {
        Some(group) if group == config.slug => {}
        Some(group) => bail!(
            "Trigger evaluator belongs to validator group '{}', policy is for '{}'",
            group,
            config.slug
        ),
        None => bail!("Trigger evaluator '{}' is not a validator identity", snapshot.trigger),
    }

    let engine = ConsolidationEngine::from_config(config);
    let outcome = engine.consolidate(trigger, &snapshot.evaluations, snapshot.prior.as_ref());

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome_json(&outcome))?);
    } else {
        print_outcome(&outcome, snapshot.prior.as_ref());
    }
    Ok(())
}

fn print_outcome(outcome: &ConsolidationOutcome, prior: Option<&ConsolidatedResult>) {
    if outcome.gate.satisfied() {
        println!("gate: satisfied");
    } else {
        if !outcome.gate.homologation_satisfied {
            println!("gate: homologation missing");
        }
        if !outcome.gate.missing_validations.is_empty() {
            println!(
                "gate: awaiting validations: {}",
                outcome.gate.missing_validations.join(", ")
            );
        }
    }

    match &outcome.result {
        Some(result) if Some(result) == prior => println!("result: {} (unchanged)", result),
        Some(result) => println!("result: {}", result),
        None => println!("result: (none)"),
    }
}

fn outcome_json(outcome: &ConsolidationOutcome) -> serde_json::Value {
    serde_json::json!({
        "result": outcome.result,
        "gate": {
            "satisfied": outcome.gate.satisfied(),
            "homologation_satisfied": outcome.gate.homologation_satisfied,
            "missing_validations": outcome.gate.missing_validations,
        },
    })
}

fn check_policy(path: &Path) -> Result<()> {
    // Schema first: structural errors come out with JSON pointers.
    let raw: serde_json::Value = load_document(path)?;
    if let Err(errors) = validate_policy_schema(&raw) {
        for error in &errors {
            eprintln!("schema: {}", error);
        }
        bail!("Policy does not match the schema ({} error(s))", errors.len());
    }

    let config = load_policy(path)?;
    println!("ok: {} ({})", config.slug, config.name);
    Ok(())
}

fn load_policy(path: &Path) -> Result<ValidatorConfig> {
    let config = if is_json(path) {
        ValidatorConfig::from_json_file(path)
    } else {
        ValidatorConfig::from_yaml_file(path)
    };
    config.with_context(|| format!("Failed to load policy from {}", path.display()))
}

fn load_document<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document = if is_json(path) {
        serde_json::from_str(&contents)?
    } else {
        serde_yaml::from_str(&contents)?
    };
    Ok(document)
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use consolida_core::Outcome;

    #[test]
    fn test_snapshot_parses_from_yaml() {
        let snapshot: LedgerSnapshot = serde_yaml::from_str(
            r#"
submission: "reg-1"
trigger: "org1@validator"
prior: "2"
evaluations:
  - submission: "reg-1"
    evaluator:
      kind: validator
      id: "org1@validator"
      group: "org1"
    result: "2"
    status: submitted
  - submission: "reg-1"
    evaluator:
      kind: human
      id: "maria"
    result: "10"
    status: submitted
"#,
        )
        .unwrap();

        assert_eq!(snapshot.evaluations.len(), 2);
        assert_eq!(
            snapshot.prior,
            Some(ConsolidatedResult::code(Outcome::Invalid))
        );
        assert_eq!(
            snapshot.evaluations[0].evaluator.validator_group(),
            Some("org1")
        );
    }

    #[test]
    fn test_snapshot_prior_defaults_to_none() {
        let snapshot: LedgerSnapshot = serde_yaml::from_str(
            r#"
submission: "reg-1"
trigger: "org1@validator"
evaluations: []
"#,
        )
        .unwrap();
        assert!(snapshot.prior.is_none());
    }
}
