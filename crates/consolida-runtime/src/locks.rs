//! Per-submission serialization.
//!
//! The engine's output depends on the prior consolidated value, so two
//! triggers for the same submission must never interleave their
//! read-modify-write: a lost update silently drops a validator's clause.
//! Different submissions proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use consolida_core::SubmissionId;

/// Lazily populated map of one mutex per submission.
#[derive(Default)]
pub struct SubmissionLocks {
    locks: Mutex<HashMap<SubmissionId, Arc<Mutex<()>>>>,
}

impl SubmissionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex guarding a submission's consolidation. Callers hold the
    /// returned lock across ledger write, engine run, and result persist.
    pub fn for_submission(&self, submission: &SubmissionId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(submission.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
