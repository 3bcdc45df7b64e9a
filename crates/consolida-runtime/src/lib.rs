//! # consolida-runtime
//!
//! In-process orchestration around the pure consolidation engine in
//! `consolida-core`.
//!
//! The engine itself owns no storage and performs no I/O; everything a
//! hosting application must put around it lives here:
//!
//! - ledger and consolidated-result stores (in-memory reference
//!   implementations of the ports the application backs with its database)
//! - per-submission serialization, so concurrent triggers can never lose a
//!   validator's clause to a read-modify-write race
//! - idempotent provisioning of each validator's synthetic evaluator
//!   account
//! - the submit-then-consolidate flow, run only for validator-identity
//!   triggers
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use consolida_core::{AlwaysEligible, ValidatorConfig};
//! use consolida_runtime::{
//!     InMemoryConsolidationStore, InMemoryDirectory, InMemoryLedger, Orchestrator,
//! };
//!
//! let mut orchestrator = Orchestrator::new(
//!     Arc::new(InMemoryLedger::new()),
//!     Arc::new(InMemoryConsolidationStore::new()),
//!     Arc::new(InMemoryDirectory::new()),
//! );
//! let account = orchestrator.register_validator(
//!     ValidatorConfig::from_yaml_file("org1.yaml")?,
//!     Arc::new(AlwaysEligible),
//! );
//! let report = orchestrator.submit_evaluation(evaluation)?;
//! ```

pub mod directory;
pub mod locks;
pub mod orchestrator;
pub mod store;

pub use directory::{IdentityDirectory, InMemoryDirectory};
pub use locks::SubmissionLocks;
pub use orchestrator::{ConsolidationReport, Orchestrator, RuntimeError};
pub use store::{
    ConsolidationStore, InMemoryConsolidationStore, InMemoryLedger, LedgerStore,
};
