//! Status - 呼び出し側に返すビュー型

use serde::Serialize;

use crate::domain::{TaskId, TaskOutcome, TaskStatus};

/// Returned on successful admission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Admission {
    pub task_id: TaskId,

    /// Also the processing timeout the reaper will enforce.
    pub estimated_timeout_secs: u64,

    /// Input size rounded to one decimal; `None` when unknown at admission.
    pub megapixels: Option<f64>,
}

/// Point-in-time view of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub task_id: TaskId,
    pub status: TaskStatus,

    /// 1-based queue position, only while Pending and still queued.
    pub position: Option<usize>,
    pub queue_size: Option<usize>,

    pub result: Option<TaskOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub queue_depth: usize,
    pub processing_count: usize,
    pub total_tracked_tasks: usize,
    pub worker_count: usize,
    pub enhancer: String,
}
