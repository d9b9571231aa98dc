//! WorkQueue port - 処理待ちタスクの FIFO
//!
//! キューは `(TaskId, ImagePayload)` だけを運ぶ。状態は TaskStore が正本。

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ImagePayload, TaskId};

/// One pending unit of work.
#[derive(Debug, Clone)]
pub struct QueuedTask {
    pub task_id: TaskId,
    pub payload: ImagePayload,
}

impl QueuedTask {
    pub fn new(task_id: TaskId, payload: ImagePayload) -> Self {
        Self { task_id, payload }
    }
}

/// 1-based position of a task among the currently queued entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuePosition {
    pub position: usize,
    pub queue_size: usize,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("work queue is full (capacity {capacity})")]
    Full { capacity: usize },
}

/// WorkQueue は FIFO の配送キュー
///
/// # 設計原則
/// - 厳密な FIFO（優先度・並べ替えなし）
/// - blocking pop（timeout 付き）。ワーカーは timeout ごとに shutdown を確認できる
/// - 取り出さずに位置を調べられる
/// - 内部ロックを TaskStore のロックと入れ子にしない
#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn push(&self, task: QueuedTask) -> Result<(), QueueError>;

    /// Wait up to `timeout` for the next task. `Ok(None)` means nothing arrived.
    async fn pop(&self, timeout: Duration) -> Result<Option<QueuedTask>, QueueError>;

    /// Position of `task_id` if it is still queued.
    async fn position(&self, task_id: TaskId) -> Option<QueuePosition>;

    async fn len(&self) -> usize;
}
