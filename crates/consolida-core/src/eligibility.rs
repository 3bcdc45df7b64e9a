//! Per-validator eligibility rules.
//!
//! Whether a validator institution reviews a given submission at all is
//! business logic owned by each deployment, not by the engine: the engine
//! assumes every record in the ledger already passed it. The orchestration
//! layer consults these rules before granting a validator identity access
//! to a submission's review workflow.

use regex::Regex;

use crate::types::Submission;

/// Decides whether a validator reviews a submission.
pub trait Eligibility: Send + Sync {
    fn is_eligible(&self, submission: &Submission) -> bool;
}

/// Every submission is eligible.
pub struct AlwaysEligible;

impl Eligibility for AlwaysEligible {
    fn is_eligible(&self, _submission: &Submission) -> bool {
        true
    }
}

/// Plain functions work as eligibility rules.
impl<F> Eligibility for F
where
    F: Fn(&Submission) -> bool + Send + Sync,
{
    fn is_eligible(&self, submission: &Submission) -> bool {
        self(submission)
    }
}

/// Eligibility by matching submission fields against regex patterns.
///
/// Every configured pattern must match its field; a submission missing one
/// of the fields is not eligible. This is the configuration-driven form of
/// the per-institution rules deployments used to hard-code.
pub struct FieldPatternEligibility {
    patterns: Vec<(String, Regex)>,
}

impl FieldPatternEligibility {
    pub fn new() -> Self {
        Self { patterns: Vec::new() }
    }

    /// Require `field` to match `pattern`.
    pub fn field_matches(
        mut self,
        field: impl Into<String>,
        pattern: &str,
    ) -> Result<Self, regex::Error> {
        self.patterns.push((field.into(), Regex::new(pattern)?));
        Ok(self)
    }
}

impl Default for FieldPatternEligibility {
    fn default() -> Self {
        Self::new()
    }
}

impl Eligibility for FieldPatternEligibility {
    fn is_eligible(&self, submission: &Submission) -> bool {
        self.patterns.iter().all(|(field, pattern)| {
            submission
                .fields
                .get(field)
                .map(|value| pattern.is_match(value))
                .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_eligible() {
        let submission = Submission::new("reg-1");
        assert!(AlwaysEligible.is_eligible(&submission));
    }

    #[test]
    fn test_function_rule() {
        let rule = |submission: &Submission| submission.id.0.starts_with("reg-");
        assert!(rule.is_eligible(&Submission::new("reg-1")));
        assert!(!rule.is_eligible(&Submission::new("opp-1")));
    }

    #[test]
    fn test_field_pattern_rule() {
        let rule = FieldPatternEligibility::new()
            .field_matches("category", "^cultura")
            .unwrap()
            .field_matches("city", "(?i)recife")
            .unwrap();

        let eligible = Submission::new("reg-1")
            .with_field("category", "cultura popular")
            .with_field("city", "Recife");
        assert!(rule.is_eligible(&eligible));

        let wrong_city = Submission::new("reg-2")
            .with_field("category", "cultura popular")
            .with_field("city", "Olinda");
        assert!(!rule.is_eligible(&wrong_city));
    }

    #[test]
    fn test_missing_field_is_not_eligible() {
        let rule = FieldPatternEligibility::new()
            .field_matches("category", ".*")
            .unwrap();
        assert!(!rule.is_eligible(&Submission::new("reg-1")));
    }

    #[test]
    fn test_no_patterns_accepts_everything() {
        let rule = FieldPatternEligibility::new();
        assert!(rule.is_eligible(&Submission::new("reg-1")));
    }
}
