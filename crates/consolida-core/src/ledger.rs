//! Evaluation ledger port.
//!
//! The engine itself only ever sees an in-memory slice of records; this
//! trait is the contract the hosting application's storage must satisfy for
//! the orchestration layer to fetch that slice.

use crate::types::{EvaluationRecord, EvaluatorId, SubmissionId};

/// Read access to the submitted evaluations of a submission.
///
/// Implementations own the one-current-record-per-(submission, evaluator)
/// invariant: a later submitted evaluation supersedes the earlier one, so
/// queries never return two records for the same evaluator.
pub trait EvaluationLedger {
    /// All current submitted evaluations of a submission, optionally
    /// restricted to the given evaluators.
    fn find_submitted_evaluations(
        &self,
        submission: &SubmissionId,
        evaluators: Option<&[EvaluatorId]>,
    ) -> Vec<EvaluationRecord>;

    /// The validator-group slug of an evaluator account, or `None` for a
    /// human evaluator or an unknown account.
    fn validator_group(&self, evaluator: &EvaluatorId) -> Option<String>;
}
