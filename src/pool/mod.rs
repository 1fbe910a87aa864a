//! Task-pool lifecycle management for Faena.
//!
//! This module implements the task state machine (available, claimed,
//! completed) under optimistic concurrency, the derived card and milestone
//! aggregate state, and the transaction coordinator that wraps a task
//! mutation, rule evaluation, and ledger writes into one atomic unit.
//! The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
