//! TaskStore: the single owner of every task record.
//!
//! All operations run under one mutex covering the whole map. Each critical
//! section is short (O(1), except `sweep` which is O(n) and runs rarely) and
//! never spans an `.await`. Callers get cloned snapshots, never references.

mod sweep;

pub use sweep::{RetentionPolicy, SweepReport};

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::domain::{CoreError, TaskId, TaskOutcome, TaskRecord, TaskStatus};
use crate::ports::Clock;

pub struct TaskStore {
    tasks: Mutex<HashMap<TaskId, TaskRecord>>,
    clock: Arc<dyn Clock>,
}

impl TaskStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Insert a new Pending record stamped with the current time.
    pub fn create(&self, id: TaskId, size_hint: Option<u64>) -> Result<(), CoreError> {
        let created_at = self.clock.now();
        let mut tasks = self.tasks.lock();
        if tasks.contains_key(&id) {
            return Err(CoreError::DuplicateId(id));
        }
        tasks.insert(id, TaskRecord::new(id, size_hint, created_at));
        Ok(())
    }

    /// Move `id` forward to a non-terminal status. Returns whether the id exists.
    ///
    /// Backward or terminal moves are ignored: a terminal record keeps its
    /// status, which stops a worker from reviving a task cancelled between its
    /// cancel check and this call. Terminal states go through `request_cancel`,
    /// `complete` and `fail`.
    pub fn set_status(&self, id: TaskId, status: TaskStatus) -> bool {
        let mut tasks = self.tasks.lock();
        let Some(record) = tasks.get_mut(&id) else {
            return false;
        };
        if !record.set_status(status) {
            tracing::debug!(task_id = %id, current = %record.status, requested = %status, "status change ignored");
        }
        true
    }

    /// Cancel a Pending or Processing task. False when absent or already terminal.
    pub fn request_cancel(&self, id: TaskId) -> bool {
        let mut tasks = self.tasks.lock();
        tasks.get_mut(&id).is_some_and(TaskRecord::cancel)
    }

    pub fn is_cancelled(&self, id: TaskId) -> bool {
        self.tasks.lock().get(&id).is_some_and(|r| r.cancelled)
    }

    /// Record a success. No-op if the task was cancelled, already finished or evicted.
    pub fn complete(&self, id: TaskId, output: Vec<u8>) -> bool {
        self.finish(id, TaskOutcome::Success(output))
    }

    /// Record a failure. Same guard as `complete`: a cancelled task stays Cancelled.
    pub fn fail(&self, id: TaskId, description: impl Into<String>) -> bool {
        self.finish(id, TaskOutcome::Error(description.into()))
    }

    fn finish(&self, id: TaskId, outcome: TaskOutcome) -> bool {
        let mut tasks = self.tasks.lock();
        tasks.get_mut(&id).is_some_and(|record| record.finish(outcome))
    }

    pub fn status(&self, id: TaskId) -> Option<TaskStatus> {
        self.tasks.lock().get(&id).map(|r| r.status)
    }

    pub fn snapshot(&self, id: TaskId) -> Option<TaskRecord> {
        self.tasks.lock().get(&id).cloned()
    }

    pub fn result(&self, id: TaskId) -> Option<TaskOutcome> {
        self.tasks.lock().get(&id).and_then(|r| r.result.clone())
    }

    /// Drop a record outright (admission rollback).
    pub fn remove(&self, id: TaskId) -> Option<TaskRecord> {
        self.tasks.lock().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    pub fn count_in(&self, status: TaskStatus) -> usize {
        self.tasks
            .lock()
            .values()
            .filter(|r| r.status == status)
            .count()
    }

    /// Reaper entry point: time out stuck tasks, expire old terminal ones and
    /// enforce the record cap, all in one critical section.
    pub fn sweep(&self, now: DateTime<Utc>, policy: &RetentionPolicy) -> SweepReport {
        let mut tasks = self.tasks.lock();
        sweep::sweep(&mut tasks, now, policy)
    }
}
