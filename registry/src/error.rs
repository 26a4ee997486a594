use quest_types::{FaultKind, TaskId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("invalid task parameter: {0}")]
    InvalidParameter(String),

    #[error("task {task} is not active (status {status})")]
    TaskNotActive { task: TaskId, status: String },

    #[error("task {task} participation window is closed at {now}")]
    TaskWindowClosed { task: TaskId, now: u64 },

    #[error("task {task} reached its participant cap of {cap}")]
    TaskFull { task: TaskId, cap: u32 },

    #[error("participant {participant} already submitted a completion for task {task}")]
    DuplicateCompletion { task: TaskId, participant: String },

    #[error("no such task: {0}")]
    UnknownTask(TaskId),

    #[error("no completion for participant {participant} on task {task}")]
    UnknownCompletion { task: TaskId, participant: String },

    #[error("task status transition {from} -> {to} is not allowed")]
    InvalidTransition { from: String, to: String },

    #[error("caller {0} lacks the required capability")]
    NotAuthorized(String),
}

impl TaskError {
    /// Classify this error into the protocol-wide fault taxonomy.
    pub fn kind(&self) -> FaultKind {
        match self {
            TaskError::InvalidParameter(_) => FaultKind::Validation,
            TaskError::TaskNotActive { .. }
            | TaskError::TaskWindowClosed { .. }
            | TaskError::TaskFull { .. }
            | TaskError::DuplicateCompletion { .. }
            | TaskError::InvalidTransition { .. } => FaultKind::StateConflict,
            TaskError::UnknownTask(_) | TaskError::UnknownCompletion { .. } => {
                FaultKind::Validation
            }
            TaskError::NotAuthorized(_) => FaultKind::Authorization,
        }
    }
}
