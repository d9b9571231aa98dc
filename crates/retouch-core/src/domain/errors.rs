//! Errors surfaced by the core to its callers.
//!
//! Failures that happen while a task is being processed are not errors here:
//! they become the task's `Error` status. Only admission and lookup problems
//! reach the caller synchronously.

use thiserror::Error;

use super::TaskId;
use crate::ports::QueueError;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed payload, bad URL or undecodable image. The task is never created.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Internal invariant violation; ids come from the generator and must be unique.
    #[error("duplicate task id: {0}")]
    DuplicateId(TaskId),

    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The work queue is bounded and full.
    #[error("service busy: work queue is at capacity ({capacity})")]
    ServiceBusy { capacity: usize },
}

impl From<QueueError> for CoreError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Full { capacity } => CoreError::ServiceBusy { capacity },
        }
    }
}
