//! Application services for the task pool.

mod board;
mod commands;

pub use board::{
    BoardError, BoardResult, BoardService, CardView, CreateCard, CreateMilestone, MilestoneView,
};
pub use commands::{
    CreateTask, DeleteTask, MutateTask, TaskCommandError, TaskCommandResult, TaskCommandService,
    TaskOperation,
};
