//! `PostgreSQL` adapters for automation ports, built on Diesel.

pub(crate) mod models;
pub(crate) mod schema;

mod evaluation;
mod ledger;
mod workflows;

pub use ledger::PostgresExecutionLedger;
pub use workflows::PostgresWorkflowRepository;
