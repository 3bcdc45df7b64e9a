//! Core data model for evaluation consolidation.
//!
//! Everything here is a plain value: the engine receives a snapshot of these
//! types and returns a new consolidated value without touching storage.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of the entity under evaluation (a registration in a call for
/// proposals, an application, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub String);

impl SubmissionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of an evaluator account, human or synthetic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluatorId(pub String);

impl EvaluatorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for EvaluatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The closed set of final outcomes understood by consolidation.
///
/// The wire codes are the ones the evaluation platform has always stored:
/// `"10"` selected, `"2"` invalid, `"3"` not selected, `"8"` alternate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Selected,
    Invalid,
    NotSelected,
    Alternate,
}

impl Outcome {
    /// The wire code stored on evaluations and consolidated results.
    pub fn code(&self) -> &'static str {
        match self {
            Outcome::Selected => "10",
            Outcome::Invalid => "2",
            Outcome::NotSelected => "3",
            Outcome::Alternate => "8",
        }
    }

    /// Classify an arbitrary code. Total: anything outside the closed set
    /// (scores, drafts, codes from other evaluation methods) is `None`.
    pub fn from_code(code: &str) -> Option<Outcome> {
        match code {
            "10" => Some(Outcome::Selected),
            "2" => Some(Outcome::Invalid),
            "3" => Some(Outcome::NotSelected),
            "8" => Some(Outcome::Alternate),
            _ => None,
        }
    }
}

/// Raw result code as recorded on an evaluation.
///
/// This is an open set: evaluation methods other than the final selection
/// store scores and free-form codes in the same field, and consolidation
/// must tolerate all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultCode(pub String);

impl ResultCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// The closed outcome this code maps to, if any.
    pub fn outcome(&self) -> Option<Outcome> {
        Outcome::from_code(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Outcome> for ResultCode {
    fn from(outcome: Outcome) -> Self {
        ResultCode(outcome.code().to_string())
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Who produced an evaluation.
///
/// Validator identities are first-class here rather than a nullable
/// "validator_for" flag on a user record: the `group` is the slug of the
/// validator institution the synthetic account evaluates for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evaluator {
    Human { id: EvaluatorId },
    Validator { id: EvaluatorId, group: String },
}

impl Evaluator {
    pub fn human(id: impl Into<String>) -> Self {
        Evaluator::Human { id: EvaluatorId::new(id) }
    }

    pub fn validator(id: impl Into<String>, group: impl Into<String>) -> Self {
        Evaluator::Validator {
            id: EvaluatorId::new(id),
            group: group.into(),
        }
    }

    pub fn id(&self) -> &EvaluatorId {
        match self {
            Evaluator::Human { id } => id,
            Evaluator::Validator { id, .. } => id,
        }
    }

    /// The validator-group slug, if this evaluator is a synthetic validator
    /// identity.
    pub fn validator_group(&self) -> Option<&str> {
        match self {
            Evaluator::Human { .. } => None,
            Evaluator::Validator { group, .. } => Some(group),
        }
    }

    pub fn is_validator(&self) -> bool {
        matches!(self, Evaluator::Validator { .. })
    }
}

/// Whether an evaluation counts for consolidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Draft,
    Submitted,
}

/// One evaluator's judgment of one submission.
///
/// The ledger keeps at most one current submitted record per
/// (submission, evaluator) pair; a later submission supersedes the earlier
/// record rather than appending to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub submission: SubmissionId,
    pub evaluator: Evaluator,

    /// Unset while the evaluator has not yet decided.
    #[serde(default)]
    pub result: Option<ResultCode>,

    pub status: EvaluationStatus,

    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl EvaluationRecord {
    /// A submitted record, stamped now.
    pub fn submitted(
        submission: SubmissionId,
        evaluator: Evaluator,
        result: impl Into<Option<ResultCode>>,
    ) -> Self {
        Self {
            submission,
            evaluator,
            result: result.into(),
            status: EvaluationStatus::Submitted,
            submitted_at: Some(Utc::now()),
        }
    }

    /// A draft record; drafts never count for consolidation.
    pub fn draft(submission: SubmissionId, evaluator: Evaluator) -> Self {
        Self {
            submission,
            evaluator,
            result: None,
            status: EvaluationStatus::Draft,
            submitted_at: None,
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.status == EvaluationStatus::Submitted
    }
}

/// The entity under evaluation, as far as this system needs to see it.
///
/// Only eligibility rules inspect the fields; the engine itself never does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,

    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl Submission {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: SubmissionId::new(id),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// The single consolidated value attached to a submission.
///
/// Either a bare outcome code (a validator finalized) or the human-readable
/// composite string that accumulates one clause per validator while no one
/// has finalized yet. Stored and serialized as the plain string the
/// evaluation platform keeps in its `consolidated_result` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConsolidatedResult {
    Code(ResultCode),
    Composite(String),
}

impl ConsolidatedResult {
    pub fn code(outcome: Outcome) -> Self {
        ConsolidatedResult::Code(outcome.into())
    }

    pub fn composite(text: impl Into<String>) -> Self {
        ConsolidatedResult::Composite(text.into())
    }

    /// Classify a stored string: known outcome codes load as `Code`,
    /// everything else as `Composite`.
    pub fn from_stored(stored: impl Into<String>) -> Self {
        let stored = stored.into();
        match Outcome::from_code(&stored) {
            Some(outcome) => ConsolidatedResult::code(outcome),
            None => ConsolidatedResult::Composite(stored),
        }
    }

    /// A blank composite counts as "no consolidation yet."
    pub fn is_empty(&self) -> bool {
        match self {
            ConsolidatedResult::Code(_) => false,
            ConsolidatedResult::Composite(text) => text.trim().is_empty(),
        }
    }

    /// Whether a validator's display name already appears in the value.
    /// Only composites carry names.
    pub fn mentions(&self, name: &str) -> bool {
        match self {
            ConsolidatedResult::Code(_) => false,
            ConsolidatedResult::Composite(text) => text.contains(name),
        }
    }

    pub fn as_outcome(&self) -> Option<Outcome> {
        match self {
            ConsolidatedResult::Code(code) => code.outcome(),
            ConsolidatedResult::Composite(_) => None,
        }
    }

    /// The stored string form.
    pub fn as_str(&self) -> &str {
        match self {
            ConsolidatedResult::Code(code) => code.as_str(),
            ConsolidatedResult::Composite(text) => text,
        }
    }
}

impl From<String> for ConsolidatedResult {
    fn from(stored: String) -> Self {
        ConsolidatedResult::from_stored(stored)
    }
}

impl From<ConsolidatedResult> for String {
    fn from(result: ConsolidatedResult) -> Self {
        result.as_str().to_string()
    }
}

impl fmt::Display for ConsolidatedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
