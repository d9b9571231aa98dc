//! InMemoryWorkQueue - プロセス内の FIFO ワークキュー
//!
//! - Mutex<VecDeque> で排他制御（ロックは await を跨がない）
//! - Notify で push 時に待機中の pop を起こす
//! - capacity を指定すると満杯時に QueueError::Full を返す

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::domain::TaskId;
use crate::ports::{QueueError, QueuePosition, QueuedTask, WorkQueue};

pub struct InMemoryWorkQueue {
    items: Mutex<VecDeque<QueuedTask>>,
    notify: Notify,
    capacity: Option<usize>,
}

impl InMemoryWorkQueue {
    /// Unbounded queue.
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// `Some(n)` rejects pushes once `n` tasks are waiting.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            capacity,
        }
    }
}

impl Default for InMemoryWorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl WorkQueue for InMemoryWorkQueue {
    async fn push(&self, task: QueuedTask) -> Result<(), QueueError> {
        {
            let mut items = self.items.lock();
            if let Some(capacity) = self.capacity
                && items.len() >= capacity
            {
                return Err(QueueError::Full { capacity });
            }
            items.push_back(task);
        }
        // Notify outside the lock; stores a permit if nobody is waiting yet.
        self.notify.notify_one();
        Ok(())
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<QueuedTask>, QueueError> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a push between the check and the
            // await is not lost.
            notified.as_mut().enable();

            let next = self.items.lock().pop_front();
            if let Some(task) = next {
                return Ok(Some(task));
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn position(&self, task_id: TaskId) -> Option<QueuePosition> {
        let items = self.items.lock();
        items
            .iter()
            .position(|queued| queued.task_id == task_id)
            .map(|index| QueuePosition {
                position: index + 1,
                queue_size: items.len(),
            })
    }

    async fn len(&self) -> usize {
        self.items.lock().len()
    }
}
