//! Workflow automation for Faena.
//!
//! This module implements the rules engine that reacts to task, card, and
//! milestone state changes: workflow and rule definitions, trigger
//! matching, idempotent rule application with suppression-reason tracking,
//! the append-only execution ledger, and rule metrics aggregation.
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
