//! Orchestration of the consolidation flow.
//!
//! The engine is a pure function; this is everything around it: persisting
//! evaluations, serializing per submission, loading the prior value, and
//! storing what the engine decides. Consolidation runs only when the
//! submitting evaluator is one of the registered validator identities —
//! human evaluations are stored and left to the platform's own evaluation
//! method.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use consolida_core::{
    ConsolidationEngine, ConsolidationOutcome, Eligibility, EvaluationRecord, Evaluator,
    Submission, SubmissionId, ValidatorConfig,
};

use crate::directory::IdentityDirectory;
use crate::locks::SubmissionLocks;
use crate::store::{ConsolidationStore, LedgerStore};

/// Errors from the orchestration layer.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("No validator is registered for group '{0}'")]
    UnknownValidator(String),
}

/// One consolidation pass, as reported to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ConsolidationReport {
    /// Slug of the validator whose engine ran.
    pub validator: String,

    /// What the engine decided.
    pub outcome: ConsolidationOutcome,

    pub consolidated_at: DateTime<Utc>,
}

/// A registered validator: engine, eligibility rule, provisioned account.
struct ValidatorInstance {
    engine: ConsolidationEngine,
    eligibility: Arc<dyn Eligibility>,
    account: Evaluator,
}

/// Drives evaluations through the consolidation engine.
pub struct Orchestrator {
    ledger: Arc<dyn LedgerStore>,
    results: Arc<dyn ConsolidationStore>,
    directory: Arc<dyn IdentityDirectory>,
    locks: SubmissionLocks,
    validators: Vec<ValidatorInstance>,

    /// Submissions each validator has been granted review access to.
    access: RwLock<BTreeMap<String, BTreeSet<SubmissionId>>>,
}

impl Orchestrator {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        results: Arc<dyn ConsolidationStore>,
        directory: Arc<dyn IdentityDirectory>,
    ) -> Self {
        Self {
            ledger,
            results,
            directory,
            locks: SubmissionLocks::new(),
            validators: Vec::new(),
            access: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register a validator: provisions its synthetic account (idempotent)
    /// and returns it.
    pub fn register_validator(
        &mut self,
        config: ValidatorConfig,
        eligibility: Arc<dyn Eligibility>,
    ) -> Evaluator {
        let engine = ConsolidationEngine::from_config(config);
        let account = self
            .directory
            .ensure_validator_identity(engine.identity());

        info!(validator = %engine.identity().slug, account = %account.id(), "validator registered");
        self.validators.push(ValidatorInstance {
            engine,
            eligibility,
            account: account.clone(),
        });
        account
    }

    /// The provisioned account of a registered validator.
    pub fn validator_account(&self, slug: &str) -> Option<&Evaluator> {
        self.validators
            .iter()
            .find(|v| v.engine.identity().slug == slug)
            .map(|v| &v.account)
    }

    /// Persist an evaluation and, when it comes from a validator identity,
    /// run that validator's consolidation inside the submission's lock.
    ///
    /// Returns the consolidation report for validator triggers, `None` for
    /// human evaluations.
    pub fn submit_evaluation(
        &self,
        record: EvaluationRecord,
    ) -> Result<Option<ConsolidationReport>, RuntimeError> {
        let instance = match record.evaluator.validator_group() {
            Some(group) => Some(
                self.validators
                    .iter()
                    .find(|v| v.engine.identity().slug == group)
                    .ok_or_else(|| RuntimeError::UnknownValidator(group.to_string()))?,
            ),
            None => None,
        };

        let submission = record.submission.clone();
        let lock = self.locks.for_submission(&submission);
        let _guard = lock.lock();

        self.ledger.record(record.clone());

        let Some(instance) = instance else {
            debug!(submission = %submission, evaluator = %record.evaluator.id(), "human evaluation stored");
            return Ok(None);
        };

        let snapshot = self.ledger.find_submitted_evaluations(&submission, None);
        let prior = self.results.get(&submission);
        let outcome = instance
            .engine
            .consolidate(&record, &snapshot, prior.as_ref());

        if let Some(result) = &outcome.result {
            self.results.set(&submission, result.clone());
            info!(
                submission = %submission,
                validator = %instance.engine.identity().slug,
                result = %result,
                "consolidated result persisted"
            );
        }

        Ok(Some(ConsolidationReport {
            validator: instance.engine.identity().slug.clone(),
            outcome,
            consolidated_at: Utc::now(),
        }))
    }

    /// Grant review access to every registered validator whose eligibility
    /// rule accepts the submission. Idempotent; returns the slugs granted
    /// in this call or earlier ones.
    pub fn grant_access_where_eligible(&self, submission: &Submission) -> Vec<String> {
        let mut access = self.access.write();
        let mut granted = Vec::new();

        for instance in &self.validators {
            let slug = &instance.engine.identity().slug;
            if instance.eligibility.is_eligible(submission) {
                access
                    .entry(slug.clone())
                    .or_default()
                    .insert(submission.id.clone());
                granted.push(slug.clone());
            }
        }

        granted
    }

    /// Whether a validator has been granted access to a submission.
    pub fn has_access(&self, slug: &str, submission: &SubmissionId) -> bool {
        self.access
            .read()
            .get(slug)
            .map(|subs| subs.contains(submission))
            .unwrap_or(false)
    }
}
