//! Error types for automation domain validation and parsing.

use super::ResourceType;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors returned while constructing workflow domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowDomainError {
    /// The workflow name is empty after trimming.
    #[error("workflow name must not be empty")]
    EmptyName,
}

/// Error returned while parsing resource types from the store boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown resource type: {0}")]
pub struct ParseResourceTypeError(pub String);

/// Errors returned while parsing a trigger from its string-typed boundary
/// representation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TriggerParseError {
    /// The resource type is not one of task, card, or milestone.
    #[error(transparent)]
    UnknownResourceType(#[from] ParseResourceTypeError),

    /// The target state does not exist for the given resource type.
    #[error("unknown state '{state}' for resource type {resource_type:?}")]
    UnknownState {
        /// Resource type the state was parsed against.
        resource_type: ResourceType,
        /// The rejected state value.
        state: String,
    },
}

/// Error returned while parsing ledger outcomes from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown execution outcome: {0}")]
pub struct ParseOutcomeError(pub String);

/// Errors returned while validating a metrics date range.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DateRangeError {
    /// `from` is later than `to`.
    #[error("date range is inverted: {from} > {to}")]
    Inverted {
        /// Start of the rejected range.
        from: DateTime<Utc>,
        /// End of the rejected range.
        to: DateTime<Utc>,
    },

    /// The window exceeds the aggregation cap.
    #[error("date range spans {days} days, exceeding the {max} day cap")]
    WindowTooWide {
        /// Width of the rejected range in days.
        days: i64,
        /// Maximum accepted width in days.
        max: i64,
    },
}
