//! Tests for the task-pool module.

mod board_service_tests;
mod command_service_tests;
mod derived_state_tests;
mod domain_tests;
mod store_tests;
