//! Port contracts for workflow automation.
//!
//! Ports define infrastructure-agnostic interfaces used by automation
//! services.

pub mod evaluation;
pub mod ledger;
pub mod repository;

pub use evaluation::{CandidateRule, EvaluationStore};
pub use ledger::{ExecutionLedger, LedgerError, LedgerResult};
pub use repository::{
    DeleteMode, WorkflowRepository, WorkflowRepositoryError, WorkflowRepositoryResult,
};
