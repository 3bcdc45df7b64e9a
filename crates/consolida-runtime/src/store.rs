//! In-memory stores for evaluations and consolidated results.
//!
//! Reference implementations of the storage the hosting application owns in
//! production. The ledger enforces the supersede invariant: one current
//! record per (submission, evaluator), later submissions overwrite.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use consolida_core::{
    ConsolidatedResult, EvaluationLedger, EvaluationRecord, EvaluatorId, SubmissionId,
};

/// Write access on top of the core ledger port.
pub trait LedgerStore: EvaluationLedger + Send + Sync {
    /// Insert or supersede the evaluator's current record for the
    /// submission.
    fn record(&self, record: EvaluationRecord);
}

/// Ledger kept entirely in memory.
#[derive(Default)]
pub struct InMemoryLedger {
    records: RwLock<BTreeMap<SubmissionId, BTreeMap<EvaluatorId, EvaluationRecord>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EvaluationLedger for InMemoryLedger {
    fn find_submitted_evaluations(
        &self,
        submission: &SubmissionId,
        evaluators: Option<&[EvaluatorId]>,
    ) -> Vec<EvaluationRecord> {
        let records = self.records.read();
        let Some(per_evaluator) = records.get(submission) else {
            return Vec::new();
        };

        per_evaluator
            .values()
            .filter(|record| record.is_submitted())
            .filter(|record| {
                evaluators
                    .map(|ids| ids.contains(record.evaluator.id()))
                    .unwrap_or(true)
            })
            .cloned()
            .collect()
    }

    fn validator_group(&self, evaluator: &EvaluatorId) -> Option<String> {
        let records = self.records.read();
        records
            .values()
            .flat_map(|per_evaluator| per_evaluator.get(evaluator))
            .find_map(|record| record.evaluator.validator_group())
            .map(str::to_string)
    }
}

impl LedgerStore for InMemoryLedger {
    fn record(&self, record: EvaluationRecord) {
        let mut records = self.records.write();
        records
            .entry(record.submission.clone())
            .or_default()
            .insert(record.evaluator.id().clone(), record);
    }
}

/// The authoritative copy of each submission's consolidated result.
pub trait ConsolidationStore: Send + Sync {
    fn get(&self, submission: &SubmissionId) -> Option<ConsolidatedResult>;
    fn set(&self, submission: &SubmissionId, result: ConsolidatedResult);
}

/// Consolidated results kept in memory.
#[derive(Default)]
pub struct InMemoryConsolidationStore {
    results: RwLock<BTreeMap<SubmissionId, ConsolidatedResult>>,
}

impl InMemoryConsolidationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConsolidationStore for InMemoryConsolidationStore {
    fn get(&self, submission: &SubmissionId) -> Option<ConsolidatedResult> {
        self.results.read().get(submission).cloned()
    }

    fn set(&self, submission: &SubmissionId, result: ConsolidatedResult) {
        self.results.write().insert(submission.clone(), result);
    }
}
