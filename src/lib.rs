//! Faena: task-pool coordination core with workflow automation.
//!
//! This crate provides the core functionality for a shared task pool:
//! claiming, releasing, and completing tasks under optimistic concurrency,
//! with a rules engine that reacts to task, card, and milestone state
//! changes by spawning follow-up tasks from templates.
//!
//! # Architecture
//!
//! Faena follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, in-memory)
//!
//! # Modules
//!
//! - [`pool`]: Task state machine, derived card/milestone state, and the
//!   transactional mutation coordinator
//! - [`automation`]: Workflow and rule definitions, the rule evaluation
//!   engine, the execution ledger, and rule metrics

pub mod automation;
pub mod pool;
