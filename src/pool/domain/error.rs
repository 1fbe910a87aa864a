//! Error types for task-pool domain validation and transitions.

use super::UserId;
use thiserror::Error;

/// Errors returned while validating task construction inputs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskValidationError {
    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The priority is outside the accepted 1–5 range.
    #[error("invalid priority {0}, expected a value between 1 and 5")]
    InvalidPriority(i16),
}

/// Errors returned by the task state machine when a transition is rejected.
///
/// The enclosing service layer maps these onto its conflict/forbidden
/// taxonomy; the domain only reports which guard failed.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TaskTransitionError {
    /// The task is already claimed and cannot be claimed again.
    #[error("task is already claimed by {claimed_by}")]
    AlreadyClaimed {
        /// The current claimant.
        claimed_by: UserId,
    },

    /// The acting user is not the current claimant.
    #[error("task is claimed by {claimed_by}, not the acting user")]
    NotClaimant {
        /// The current claimant.
        claimed_by: UserId,
    },

    /// The operation requires the task to be claimed.
    #[error("task is not claimed")]
    NotClaimed,

    /// The task is completed; no further transitions exist.
    #[error("task is completed and accepts no further transitions")]
    Terminal,

    /// `start_work` was called while a work session is already running.
    #[error("a work session is already running for this task")]
    WorkSessionActive,

    /// `pause_work` was called while no work session is running.
    #[error("no work session is running for this task")]
    WorkSessionIdle,
}

/// Error returned while parsing task status discriminants from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing claim modes from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown claim mode: {0}")]
pub struct ParseClaimModeError(pub String);

/// Error returned while parsing card states from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown card state: {0}")]
pub struct ParseCardStateError(pub String);

/// Error returned while parsing milestone states from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown milestone state: {0}")]
pub struct ParseMilestoneStateError(pub String);

/// Error returned while reconstructing version counters from persistence.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("invalid task version {0}, expected a positive integer")]
pub struct InvalidVersionError(pub i64);
