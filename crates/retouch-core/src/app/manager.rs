//! TaskManager - ゲートウェイ向けの操作（submit / status / cancel / health）
//!
//! TaskStore と WorkQueue を順番に触るだけで、二つのロックを入れ子にしない。

use std::sync::Arc;

use tracing::{info, warn};

use super::status::{Admission, HealthSnapshot, StatusReport};
use crate::domain::{CoreError, ImagePayload, TaskId, TaskStatus, megapixels, timeout_for};
use crate::ports::{IdGenerator, QueuedTask, WorkQueue};
use crate::store::TaskStore;

pub struct TaskManager {
    store: Arc<TaskStore>,
    queue: Arc<dyn WorkQueue>,
    ids: Arc<dyn IdGenerator>,
    worker_count: usize,
    enhancer_name: String,
}

impl TaskManager {
    pub fn new(
        store: Arc<TaskStore>,
        queue: Arc<dyn WorkQueue>,
        ids: Arc<dyn IdGenerator>,
        worker_count: usize,
        enhancer_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            queue,
            ids,
            worker_count,
            enhancer_name: enhancer_name.into(),
        }
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    pub fn queue(&self) -> &Arc<dyn WorkQueue> {
        &self.queue
    }

    /// Create a task and queue it. The returned estimate is the timeout the
    /// reaper will apply once the task is processing.
    pub async fn submit(
        &self,
        payload: ImagePayload,
        size_hint: Option<u64>,
    ) -> Result<Admission, CoreError> {
        let task_id = self.ids.generate_task_id();
        if let Err(err) = self.store.create(task_id, size_hint) {
            tracing::error!(task_id = %task_id, error = %err, "id generator produced a duplicate");
            return Err(err);
        }

        let kind = payload.kind();
        if let Err(err) = self.queue.push(QueuedTask::new(task_id, payload)).await {
            self.store.remove(task_id);
            warn!(task_id = %task_id, error = %err, "enqueue failed, admission rolled back");
            return Err(err.into());
        }

        let estimated_timeout_secs = timeout_for(size_hint).as_secs();
        let mp = size_hint
            .filter(|&p| p > 0)
            .map(|p| (megapixels(p) * 10.0).round() / 10.0);
        info!(task_id = %task_id, payload = kind, megapixels = ?mp, estimated_timeout_secs, "task admitted");

        Ok(Admission {
            task_id,
            estimated_timeout_secs,
            megapixels: mp,
        })
    }

    pub async fn query_status(&self, task_id: TaskId) -> Result<StatusReport, CoreError> {
        // Store lock is released before the queue is consulted.
        let record = self
            .store
            .snapshot(task_id)
            .ok_or(CoreError::NotFound(task_id))?;

        let (position, queue_size) = match record.status {
            TaskStatus::Pending => match self.queue.position(task_id).await {
                Some(p) => (Some(p.position), Some(p.queue_size)),
                // Popped by a worker, not yet marked Processing.
                None => (None, None),
            },
            _ => (None, None),
        };

        Ok(StatusReport {
            task_id,
            status: record.status,
            position,
            queue_size,
            result: record.result,
        })
    }

    /// True if the task was Pending or Processing and is now Cancelled.
    pub fn request_cancellation(&self, task_id: TaskId) -> bool {
        let cancelled = self.store.request_cancel(task_id);
        if cancelled {
            info!(task_id = %task_id, "task cancelled by request");
        }
        cancelled
    }

    pub async fn health_snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            queue_depth: self.queue.len().await,
            processing_count: self.store.count_in(TaskStatus::Processing),
            total_tracked_tasks: self.store.len(),
            worker_count: self.worker_count,
            enhancer: self.enhancer_name.clone(),
        }
    }
}
