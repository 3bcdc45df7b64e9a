//! # consolida-core
//!
//! Deterministic evaluation consolidation engine.
//!
//! This crate provides the core decision logic for Consolida, answering,
//! for a submission under review:
//! - May the consolidated outcome become final yet?
//! - What value or composite string does it take?
//! - How does it stay stable as evaluations keep arriving?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same snapshot always produces same output
//! 2. **Idempotent**: Re-triggering never duplicates a validator's clause
//! 3. **Never blocks the pipeline**: Malformed codes degrade to "no change"
//! 4. **Pure**: No I/O, no clocks, no shared mutable state
//!
//! ## Example
//!
//! ```rust,ignore
//! use consolida_core::{consolidate, ValidatorConfig};
//!
//! let config = ValidatorConfig::from_yaml_file("org1.yaml")?;
//! let outcome = consolidate(&config, &trigger, &ledger, prior.as_ref());
//!
//! if let Some(result) = outcome.result {
//!     println!("consolidated: {}", result);
//! }
//! ```

pub mod eligibility;
pub mod engine;
pub mod labels;
pub mod ledger;
pub mod policy;
pub mod types;

// Re-export main types at crate root
pub use eligibility::{AlwaysEligible, Eligibility, FieldPatternEligibility};
pub use engine::{ConsolidationEngine, ConsolidationGate, ConsolidationOutcome};
pub use ledger::EvaluationLedger;
pub use policy::{PolicyError, ValidatorConfig, ValidatorIdentity, ValidatorPolicy};
pub use types::{
    ConsolidatedResult, EvaluationRecord, EvaluationStatus, Evaluator, EvaluatorId, Outcome,
    ResultCode, Submission, SubmissionId,
};

/// Run one consolidation pass for the validator described by `config`.
///
/// Convenience entry point wrapping [`ConsolidationEngine`]; callers that
/// consolidate repeatedly should build the engine once instead.
///
/// # Arguments
///
/// * `config` - the validator's policy document
/// * `trigger` - the validator identity's own evaluation that re-triggered
///   consolidation
/// * `ledger` - the submission's current evaluations
/// * `prior` - the previously persisted consolidated value, if any
pub fn consolidate(
    config: &ValidatorConfig,
    trigger: &EvaluationRecord,
    ledger: &[EvaluationRecord],
    prior: Option<&ConsolidatedResult>,
) -> ConsolidationOutcome {
    ConsolidationEngine::from_config(config.clone()).consolidate(trigger, ledger, prior)
}
