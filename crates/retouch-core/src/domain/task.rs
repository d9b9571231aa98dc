//! Task record: the tracked state of one submitted unit of work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{TaskId, TaskStatus};

/// Terminal result of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// Encoded output image.
    Success(Vec<u8>),

    /// Human-readable failure description.
    Error(String),
}

/// Single source of truth for a task. Owned by `TaskStore`; everyone else
/// receives clones.
///
/// Design:
/// - `cancelled` is an intent flag separate from `status`. Once set it stays set.
/// - `result` is written once, when entering Completed or Error.
/// - State changes go through the methods below, which refuse to leave a
///   terminal state.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub id: TaskId,
    pub status: TaskStatus,
    pub cancelled: bool,
    pub created_at: DateTime<Utc>,

    /// Pixel count of the input, when known at admission.
    pub size_hint: Option<u64>,

    pub result: Option<TaskOutcome>,
}

impl TaskRecord {
    pub fn new(id: TaskId, size_hint: Option<u64>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            status: TaskStatus::Pending,
            cancelled: false,
            created_at,
            size_hint,
            result: None,
        }
    }

    /// Age at `now`, clamped to zero if the clock went backwards.
    pub fn age(&self, now: DateTime<Utc>) -> std::time::Duration {
        (now - self.created_at).to_std().unwrap_or_default()
    }

    /// Move forward to a non-terminal status. Terminal states are reached only
    /// through `cancel` and `finish`, which also set the flag or the result.
    /// Returns whether the record is now in `status`.
    pub fn set_status(&mut self, status: TaskStatus) -> bool {
        if self.status == status {
            return true;
        }
        if status.is_terminal() || !self.status.can_transition_to(status) {
            return false;
        }
        self.status = status;
        true
    }

    /// Set the cancel flag and move to Cancelled (Pending/Processing only).
    pub fn cancel(&mut self) -> bool {
        if !self.status.is_cancellable() {
            return false;
        }
        self.cancelled = true;
        self.status = TaskStatus::Cancelled;
        true
    }

    /// Record the terminal outcome unless the task was cancelled or already
    /// finished. Returns whether the outcome was recorded.
    pub fn finish(&mut self, outcome: TaskOutcome) -> bool {
        if self.cancelled || self.status.is_terminal() {
            return false;
        }
        self.status = match outcome {
            TaskOutcome::Success(_) => TaskStatus::Completed,
            TaskOutcome::Error(_) => TaskStatus::Error,
        };
        self.result = Some(outcome);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn record() -> TaskRecord {
        TaskRecord::new(TaskId::from_ulid(Ulid::new()), None, Utc::now())
    }

    #[test]
    fn new_record_is_pending() {
        let r = record();
        assert_eq!(r.status, TaskStatus::Pending);
        assert!(!r.cancelled);
        assert!(r.result.is_none());
    }

    #[test]
    fn finish_after_cancel_is_ignored() {
        let mut r = record();
        r.set_status(TaskStatus::Processing);
        assert!(r.cancel());
        assert!(!r.finish(TaskOutcome::Success(vec![1, 2, 3])));
        assert_eq!(r.status, TaskStatus::Cancelled);
        assert!(r.result.is_none());
    }

    #[test]
    fn result_is_write_once() {
        let mut r = record();
        r.set_status(TaskStatus::Processing);
        assert!(r.finish(TaskOutcome::Success(vec![7])));
        assert!(!r.finish(TaskOutcome::Error("late".into())));
        assert_eq!(r.status, TaskStatus::Completed);
        assert_eq!(r.result, Some(TaskOutcome::Success(vec![7])));
    }

    #[test]
    fn terminal_status_is_sticky() {
        let mut r = record();
        r.cancel();
        assert!(!r.set_status(TaskStatus::Processing));
        assert!(!r.cancel());
        assert_eq!(r.status, TaskStatus::Cancelled);
    }

    #[test]
    fn set_status_only_moves_forward() {
        let mut r = record();
        assert!(r.set_status(TaskStatus::Processing));
        assert!(!r.set_status(TaskStatus::Pending));
        assert_eq!(r.status, TaskStatus::Processing);
        assert!(r.set_status(TaskStatus::Processing));
    }

    #[test]
    fn set_status_cannot_skip_to_terminal() {
        let mut r = record();
        assert!(!r.set_status(TaskStatus::Completed));
        r.set_status(TaskStatus::Processing);
        assert!(!r.set_status(TaskStatus::Error));
        assert!(!r.set_status(TaskStatus::Cancelled));
        assert_eq!(r.status, TaskStatus::Processing);
        assert!(!r.cancelled);
        assert!(r.result.is_none());
    }

    #[test]
    fn age_never_negative() {
        let r = record();
        let earlier = r.created_at - chrono::Duration::seconds(5);
        assert_eq!(r.age(earlier), std::time::Duration::ZERO);
    }
}
