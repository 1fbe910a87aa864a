//! Port contracts for the task pool.
//!
//! Ports define infrastructure-agnostic interfaces used by pool services.

pub mod repository;
pub mod store;

pub use repository::{BoardRepository, BoardRepositoryError, BoardRepositoryResult};
pub use store::{
    MutationTransaction, StoreError, StoreResult, TaskStore, UpdateOutcome,
};
