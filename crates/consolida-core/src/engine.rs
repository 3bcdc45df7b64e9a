//! Consolidation engine: decides the consolidated result of a submission.
//!
//! The engine applies strict, non-configurable rules over a snapshot of
//! submitted evaluations:
//! 1. Gate: homologation and required validations must be present.
//! 2. Gate satisfied → an absolute validator finalizes with its own outcome
//!    code; a non-absolute validator leaves the result to whoever finalizes.
//! 3. Gate not satisfied → the validator contributes one clause to the
//!    composite string, at most once.
//!
//! The computation is pure and idempotent for a fixed snapshot: re-running
//! with the same inputs, or with its own output as the prior value, yields
//! the same result. Serializing concurrent runs for the *same* submission is
//! the caller's job; two validators reading the same stale prior can still
//! overwrite each other's clause.

use serde::Serialize;
use tracing::debug;

use crate::labels;
use crate::policy::{ValidatorConfig, ValidatorIdentity, ValidatorPolicy};
use crate::types::{ConsolidatedResult, EvaluationRecord, ResultCode};

/// Outcome of both gate checks, reported independently so a configuration
/// that can never be satisfied stays visible to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolidationGate {
    /// False only when homologation is required and no non-validator
    /// evaluation has been submitted.
    pub homologation_satisfied: bool,

    /// Required validator groups with no submitted evaluation.
    pub missing_validations: Vec<String>,
}

impl ConsolidationGate {
    pub fn satisfied(&self) -> bool {
        self.homologation_satisfied && self.missing_validations.is_empty()
    }
}

/// What one consolidation pass decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolidationOutcome {
    /// The value to persist against the submission. May equal the prior
    /// value; `None` means no consolidation has produced a value yet.
    pub result: Option<ConsolidatedResult>,

    /// The gate report for this pass.
    pub gate: ConsolidationGate,
}

/// The consolidation engine for one validator institution.
///
/// Stateless apart from its identity and policy; safe to share and to call
/// concurrently for different submissions.
#[derive(Debug, Clone)]
pub struct ConsolidationEngine {
    identity: ValidatorIdentity,
    policy: ValidatorPolicy,
}

impl ConsolidationEngine {
    pub fn new(identity: ValidatorIdentity, policy: ValidatorPolicy) -> Self {
        Self { identity, policy }
    }

    pub fn from_config(config: ValidatorConfig) -> Self {
        let (identity, policy) = config.into_parts();
        Self::new(identity, policy)
    }

    pub fn identity(&self) -> &ValidatorIdentity {
        &self.identity
    }

    pub fn policy(&self) -> &ValidatorPolicy {
        &self.policy
    }

    /// Compute the next consolidated result.
    ///
    /// # Arguments
    ///
    /// * `trigger` - the evaluation of this validator's own identity that
    ///   re-triggered consolidation (the caller guarantees the gating;
    ///   the record is only used for its result code)
    /// * `ledger` - all current evaluations of the submission; drafts are
    ///   ignored here
    /// * `prior` - the previously persisted consolidated value, if any
    ///
    /// Never fails: unrecognized result codes and empty ledgers degrade to
    /// "no change."
    pub fn consolidate(
        &self,
        trigger: &EvaluationRecord,
        ledger: &[EvaluationRecord],
        prior: Option<&ConsolidatedResult>,
    ) -> ConsolidationOutcome {
        let submitted: Vec<&EvaluationRecord> =
            ledger.iter().filter(|e| e.is_submitted()).collect();

        // A blank stored string means no consolidation has happened yet.
        let prior = prior.filter(|p| !p.is_empty());

        let gate = self.gate(&submitted);
        debug!(
            validator = %self.identity.slug,
            submission = %trigger.submission,
            homologation_satisfied = gate.homologation_satisfied,
            missing_validations = ?gate.missing_validations,
            "consolidation gate evaluated"
        );

        let result = if gate.satisfied() {
            if self.policy.is_absolute {
                // Absolute: the trigger's own code overwrites any composite.
                // A trigger with no code yet leaves the prior untouched.
                match &trigger.result {
                    Some(code) => {
                        debug!(validator = %self.identity.slug, code = %code, "absolute finalization");
                        Some(ConsolidatedResult::Code(code.clone()))
                    }
                    None => prior.cloned(),
                }
            } else {
                // Satisfied but not absolute: defer to the eventual
                // finalizer, leave the result as it stands.
                prior.cloned()
            }
        } else {
            self.accumulate(trigger, submitted.len(), prior)
        };

        ConsolidationOutcome { result, gate }
    }

    /// Both gate checks, never short-circuited.
    fn gate(&self, submitted: &[&EvaluationRecord]) -> ConsolidationGate {
        let homologation_satisfied = !self.policy.homologation_required
            || submitted.iter().any(|e| !e.evaluator.is_validator());

        let missing_validations: Vec<String> = self
            .policy
            .required_validations
            .iter()
            // A policy naming this validator's own group is satisfied by
            // the triggering evaluation itself.
            .filter(|group| group.as_str() != self.identity.slug)
            .filter(|group| {
                !submitted
                    .iter()
                    .any(|e| e.evaluator.validator_group() == Some(group.as_str()))
            })
            .cloned()
            .collect();

        ConsolidationGate {
            homologation_satisfied,
            missing_validations,
        }
    }

    /// Contribute this validator's clause to the composite string.
    fn accumulate(
        &self,
        trigger: &EvaluationRecord,
        submitted_count: usize,
        prior: Option<&ConsolidatedResult>,
    ) -> Option<ConsolidatedResult> {
        // Outside the closed outcome set there is nothing to say yet.
        let outcome = match trigger.result.as_ref().and_then(ResultCode::outcome) {
            Some(outcome) => outcome,
            None => return prior.cloned(),
        };

        let name = &self.identity.name;
        let clause = labels::clause(outcome, name);

        match prior {
            // First real contribution: replace, never append, so the
            // validator's own re-runs cannot duplicate it.
            None => Some(ConsolidatedResult::composite(clause)),
            Some(_) if submitted_count <= 1 => Some(ConsolidatedResult::composite(clause)),

            Some(p) if !p.mentions(name) => {
                // A bare outcome code is translated exactly once before the
                // first concatenation; composites are never re-translated.
                let current = match p {
                    ConsolidatedResult::Code(code) => code
                        .outcome()
                        .map(|o| labels::label(o).to_string())
                        .unwrap_or_else(|| code.as_str().to_string()),
                    ConsolidatedResult::Composite(text) => text.clone(),
                };
                Some(ConsolidatedResult::composite(format!("{}, {}", current, clause)))
            }

            // Already mentioned: idempotent re-trigger, keep as is.
            Some(p) => Some(p.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Evaluator, Outcome, SubmissionId};

    fn engine(name: &str, slug: &str, policy: ValidatorPolicy) -> ConsolidationEngine {
        ConsolidationEngine::new(ValidatorIdentity::new(name, slug), policy)
    }

    fn submitted(evaluator: Evaluator, result: Option<Outcome>) -> EvaluationRecord {
        EvaluationRecord::submitted(
            SubmissionId::new("reg-1"),
            evaluator,
            result.map(ResultCode::from),
        )
    }

    fn org1() -> Evaluator {
        Evaluator::validator("org1@validator", "org1")
    }

    fn org2() -> Evaluator {
        Evaluator::validator("org2@validator", "org2")
    }

    #[test]
    fn test_homologation_gate_blocks_validator_only_ledger() {
        let engine = engine("Org1", "org1", ValidatorPolicy::default());
        let trigger = submitted(org1(), Some(Outcome::Selected));
        let ledger = vec![trigger.clone()];

        let outcome = engine.consolidate(&trigger, &ledger, None);

        assert!(!outcome.gate.homologation_satisfied);
        assert!(!outcome.gate.satisfied());
        assert_eq!(
            outcome.result,
            Some(ConsolidatedResult::composite("validado por Org1"))
        );
    }

    #[test]
    fn test_homologation_satisfied_by_human_evaluation() {
        let engine = engine("Org1", "org1", ValidatorPolicy::default());
        let trigger = submitted(org1(), Some(Outcome::Selected));
        let ledger = vec![
            submitted(Evaluator::human("maria"), Some(Outcome::Selected)),
            trigger.clone(),
        ];

        let outcome = engine.consolidate(&trigger, &ledger, None);

        assert!(outcome.gate.satisfied());
        // Non-absolute: defers, result stays absent.
        assert_eq!(outcome.result, None);
    }

    #[test]
    fn test_required_validations_gate() {
        let policy = ValidatorPolicy {
            homologation_required: false,
            required_validations: ["org2".to_string()].into(),
            ..ValidatorPolicy::default()
        };
        let engine = engine("Org1", "org1", policy);
        let trigger = submitted(org1(), Some(Outcome::Selected));
        let ledger = vec![trigger.clone()];

        let outcome = engine.consolidate(&trigger, &ledger, None);
        assert_eq!(outcome.gate.missing_validations, vec!["org2".to_string()]);
        assert!(!outcome.gate.satisfied());

        // Once org2 has submitted, the gate opens.
        let ledger = vec![trigger.clone(), submitted(org2(), Some(Outcome::Invalid))];
        let outcome = engine.consolidate(&trigger, &ledger, None);
        assert!(outcome.gate.satisfied());
    }

    #[test]
    fn test_unknown_required_group_never_satisfies() {
        let policy = ValidatorPolicy {
            homologation_required: false,
            required_validations: ["nonexistent".to_string()].into(),
            ..ValidatorPolicy::default()
        };
        let engine = engine("Org1", "org1", policy);
        let trigger = submitted(org1(), Some(Outcome::Selected));
        let ledger = vec![
            trigger.clone(),
            submitted(org2(), Some(Outcome::Selected)),
            submitted(Evaluator::human("maria"), Some(Outcome::Selected)),
        ];

        let outcome = engine.consolidate(&trigger, &ledger, None);
        assert_eq!(
            outcome.gate.missing_validations,
            vec!["nonexistent".to_string()]
        );
        assert!(!outcome.gate.satisfied());
    }

    #[test]
    fn test_own_group_requirement_is_always_satisfied() {
        let policy = ValidatorPolicy {
            homologation_required: false,
            required_validations: ["org1".to_string()].into(),
            ..ValidatorPolicy::default()
        };
        let engine = engine("Org1", "org1", policy);
        let trigger = submitted(org1(), Some(Outcome::Selected));

        let outcome = engine.consolidate(&trigger, &[trigger.clone()], None);
        assert!(outcome.gate.satisfied());
    }

    #[test]
    fn test_both_gate_checks_reported_independently() {
        let policy = ValidatorPolicy {
            homologation_required: true,
            required_validations: ["org2".to_string(), "org3".to_string()].into(),
            ..ValidatorPolicy::default()
        };
        let engine = engine("Org1", "org1", policy);
        let trigger = submitted(org1(), Some(Outcome::Selected));

        let outcome = engine.consolidate(&trigger, &[trigger.clone()], None);
        assert!(!outcome.gate.homologation_satisfied);
        assert_eq!(
            outcome.gate.missing_validations,
            vec!["org2".to_string(), "org3".to_string()]
        );
    }

    #[test]
    fn test_absolute_override_discards_composite() {
        let policy = ValidatorPolicy {
            is_absolute: true,
            homologation_required: true,
            ..ValidatorPolicy::default()
        };
        let engine = engine("Org1", "org1", policy);
        let trigger = submitted(org1(), Some(Outcome::Selected));
        let ledger = vec![
            submitted(Evaluator::human("maria"), Some(Outcome::Selected)),
            trigger.clone(),
        ];
        let prior = ConsolidatedResult::composite("invalidado por Org2");

        let outcome = engine.consolidate(&trigger, &ledger, Some(&prior));
        assert_eq!(outcome.result, Some(ConsolidatedResult::code(Outcome::Selected)));
    }

    #[test]
    fn test_absolute_still_requires_homologation() {
        let policy = ValidatorPolicy {
            is_absolute: true,
            homologation_required: true,
            ..ValidatorPolicy::default()
        };
        let engine = engine("Org1", "org1", policy);
        let trigger = submitted(org1(), Some(Outcome::Selected));
        let ledger = vec![trigger.clone()];

        let outcome = engine.consolidate(&trigger, &ledger, None);
        assert!(!outcome.gate.satisfied());
        // Falls back to the accumulating clause, never a bare code.
        assert_eq!(
            outcome.result,
            Some(ConsolidatedResult::composite("validado por Org1"))
        );
    }

    #[test]
    fn test_absolute_with_unset_result_keeps_prior() {
        let policy = ValidatorPolicy {
            is_absolute: true,
            homologation_required: false,
            ..ValidatorPolicy::default()
        };
        let engine = engine("Org1", "org1", policy);
        let trigger = submitted(org1(), None);
        let prior = ConsolidatedResult::composite("suplente por Org2");

        let outcome = engine.consolidate(&trigger, &[trigger.clone()], Some(&prior));
        assert_eq!(outcome.result, Some(prior));
    }

    #[test]
    fn test_first_clause_replaces() {
        let engine = engine("Org1", "org1", ValidatorPolicy::default());
        let trigger = submitted(org1(), Some(Outcome::Invalid));
        let ledger = vec![trigger.clone()];

        let outcome = engine.consolidate(&trigger, &ledger, None);
        assert_eq!(
            outcome.result,
            Some(ConsolidatedResult::composite("invalidado por Org1"))
        );
    }

    #[test]
    fn test_second_clause_appends_with_code_translation() {
        // The prior is a bare outcome code: it is translated exactly once
        // before the first concatenation.
        let engine = engine("Org2", "org2", ValidatorPolicy::default());
        let trigger = submitted(org2(), Some(Outcome::NotSelected));
        let ledger = vec![
            submitted(org1(), Some(Outcome::Invalid)),
            trigger.clone(),
        ];
        let prior = ConsolidatedResult::code(Outcome::Invalid);

        let outcome = engine.consolidate(&trigger, &ledger, Some(&prior));
        assert_eq!(
            outcome.result,
            Some(ConsolidatedResult::composite(
                "inválida, não selecionado por Org2"
            ))
        );
    }

    #[test]
    fn test_second_clause_appends_to_composite_verbatim() {
        let engine = engine("Org2", "org2", ValidatorPolicy::default());
        let trigger = submitted(org2(), Some(Outcome::NotSelected));
        let ledger = vec![
            submitted(org1(), Some(Outcome::Invalid)),
            trigger.clone(),
        ];
        let prior = ConsolidatedResult::composite("invalidado por Org1");

        let outcome = engine.consolidate(&trigger, &ledger, Some(&prior));
        assert_eq!(
            outcome.result,
            Some(ConsolidatedResult::composite(
                "invalidado por Org1, não selecionado por Org2"
            ))
        );
    }

    #[test]
    fn test_unknown_code_prior_is_used_verbatim() {
        let engine = engine("Org2", "org2", ValidatorPolicy::default());
        let trigger = submitted(org2(), Some(Outcome::Alternate));
        let ledger = vec![
            submitted(org1(), Some(Outcome::Selected)),
            trigger.clone(),
        ];
        // e.g. an absolute validator from another evaluation method wrote a
        // score; it has no label, so it concatenates as stored.
        let prior = ConsolidatedResult::Code(ResultCode::new("7.5"));

        let outcome = engine.consolidate(&trigger, &ledger, Some(&prior));
        assert_eq!(
            outcome.result,
            Some(ConsolidatedResult::composite("7.5, suplente por Org2"))
        );
    }

    #[test]
    fn test_no_duplicate_clause_on_retrigger() {
        let engine = engine("Org1", "org1", ValidatorPolicy::default());
        let trigger = submitted(org1(), Some(Outcome::Invalid));
        let ledger = vec![
            trigger.clone(),
            submitted(org2(), Some(Outcome::Selected)),
        ];
        let prior = ConsolidatedResult::composite("invalidado por Org1, validado por Org2");

        let outcome = engine.consolidate(&trigger, &ledger, Some(&prior));
        assert_eq!(outcome.result, Some(prior));
    }

    #[test]
    fn test_unknown_trigger_code_is_a_no_op() {
        let engine = engine("Org1", "org1", ValidatorPolicy::default());
        let trigger = submitted(org1(), None);
        let prior = ConsolidatedResult::composite("validado por Org2");

        let outcome = engine.consolidate(&trigger, &[trigger.clone()], Some(&prior));
        assert_eq!(outcome.result, Some(prior.clone()));

        let mut scored = submitted(org1(), None);
        scored.result = Some(ResultCode::new("42"));
        let outcome = engine.consolidate(&scored, &[scored.clone()], Some(&prior));
        assert_eq!(outcome.result, Some(prior));
    }

    #[test]
    fn test_unknown_trigger_code_with_no_prior_stays_absent() {
        let engine = engine("Org1", "org1", ValidatorPolicy::default());
        let trigger = submitted(org1(), None);

        let outcome = engine.consolidate(&trigger, &[trigger.clone()], None);
        assert_eq!(outcome.result, None);
    }

    #[test]
    fn test_blank_prior_counts_as_absent() {
        let engine = engine("Org1", "org1", ValidatorPolicy::default());
        let trigger = submitted(org1(), Some(Outcome::Selected));
        let blank = ConsolidatedResult::composite("");

        let outcome = engine.consolidate(&trigger, &[trigger.clone()], Some(&blank));
        assert_eq!(
            outcome.result,
            Some(ConsolidatedResult::composite("validado por Org1"))
        );
    }

    #[test]
    fn test_draft_records_do_not_count() {
        let engine = engine("Org1", "org1", ValidatorPolicy::default());
        let trigger = submitted(org1(), Some(Outcome::Selected));
        let ledger = vec![
            EvaluationRecord::draft(SubmissionId::new("reg-1"), Evaluator::human("maria")),
            trigger.clone(),
        ];

        // The human draft does not homologate.
        let outcome = engine.consolidate(&trigger, &ledger, None);
        assert!(!outcome.gate.homologation_satisfied);
    }

    #[test]
    fn test_idempotent_for_fixed_snapshot() {
        let engine = engine("Org1", "org1", ValidatorPolicy::default());
        let trigger = submitted(org1(), Some(Outcome::Invalid));
        let ledger = vec![
            trigger.clone(),
            submitted(org2(), Some(Outcome::Selected)),
        ];
        let prior = ConsolidatedResult::composite("validado por Org2");

        let first = engine.consolidate(&trigger, &ledger, Some(&prior));
        let second = engine.consolidate(&trigger, &ledger, Some(&prior));
        assert_eq!(first, second);

        // Feeding the output back as the prior is a fixed point.
        let third = engine.consolidate(&trigger, &ledger, first.result.as_ref());
        assert_eq!(third.result, first.result);
    }
}
