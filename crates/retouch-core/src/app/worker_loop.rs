//! WorkerLoop - タスク実行ループ
//!
//! # フロー
//! 1. WorkQueue::pop() で次のタスクを取得（shutdown と select で競合させる）
//! 2. キャンセル済みならスキップ
//! 3. Processing に遷移
//! 4. 入力の解決（inline / fetch）→ Enhancer（spawn_blocking）
//! 5. complete / fail を store に反映
//!
//! キャンセルは各ステップの前後で CancelCheck を通して確認する。
//! Enhancer の呼び出し中は中断できない。

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{ImagePayload, TaskId, TaskStatus};
use crate::ports::{Enhancer, ImageFetcher, QueuedTask, WorkQueue};
use crate::store::TaskStore;

/// Everything a worker needs. Cloned once per worker.
#[derive(Clone)]
pub struct WorkerDeps {
    pub store: Arc<TaskStore>,
    pub queue: Arc<dyn WorkQueue>,
    pub enhancer: Arc<dyn Enhancer>,
    pub fetcher: Arc<dyn ImageFetcher>,
    pub poll_interval: Duration,
}

/// Worker pool handle.
/// - `shutdown_tx` を drop するとワーカー全体が止まる
/// - `shutdown_and_join()` で全ワーカーの終了を待てる
pub struct WorkerPool {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `n` workers sharing one queue.
    pub fn spawn(n: usize, deps: WorkerDeps) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let joins = (0..n)
            .map(|worker_id| {
                let deps = deps.clone();
                let rx = shutdown_rx.clone();
                tokio::spawn(worker_loop(worker_id, deps, rx))
            })
            .collect();

        info!(workers = n, enhancer = deps.enhancer.name(), "worker pool started");
        Self { shutdown_tx, joins }
    }

    pub fn size(&self) -> usize {
        self.joins.len()
    }

    /// Stop taking new tasks. A task already being processed runs to the end.
    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for join in self.joins {
            if let Err(err) = join.await {
                warn!(error = %err, "worker ended abnormally");
            }
        }
        info!("worker pool stopped");
    }
}

async fn worker_loop(worker_id: usize, deps: WorkerDeps, mut shutdown_rx: watch::Receiver<bool>) {
    debug!(worker_id, "worker started");
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // pop は最大 poll_interval 待つので shutdown と競合させる
        let popped = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    // sender dropped
                    break;
                }
                continue;
            }
            popped = deps.queue.pop(deps.poll_interval) => popped,
        };

        let task = match popped {
            Ok(Some(task)) => task,
            Ok(None) => continue,
            Err(err) => {
                warn!(worker_id, error = %err, "queue pop failed");
                tokio::time::sleep(deps.poll_interval).await;
                continue;
            }
        };

        run_one(worker_id, &deps, task).await;
    }
    debug!(worker_id, "worker stopped");
}

/// Why processing of one task stopped early.
#[derive(Debug, Error, PartialEq, Eq)]
enum ProcessError {
    #[error("task was cancelled")]
    Cancelled,

    #[error("{0}")]
    Failed(String),
}

/// Reads the cancel flag of one task from the store.
struct CancelCheck<'a> {
    store: &'a TaskStore,
    task_id: TaskId,
}

impl<'a> CancelCheck<'a> {
    fn new(store: &'a TaskStore, task_id: TaskId) -> Self {
        Self { store, task_id }
    }

    fn ensure_active(&self) -> Result<(), ProcessError> {
        if self.store.is_cancelled(self.task_id) {
            return Err(ProcessError::Cancelled);
        }
        Ok(())
    }
}

async fn run_one(worker_id: usize, deps: &WorkerDeps, task: QueuedTask) {
    let QueuedTask { task_id, payload } = task;

    if deps.store.is_cancelled(task_id) {
        debug!(worker_id, task_id = %task_id, "skipping cancelled task");
        return;
    }
    if !deps.store.set_status(task_id, TaskStatus::Processing) {
        // evicted while queued
        debug!(worker_id, task_id = %task_id, "task record gone, skipping");
        return;
    }
    info!(worker_id, task_id = %task_id, payload = payload.kind(), "processing started");

    let check = CancelCheck::new(&deps.store, task_id);
    match process(deps, payload, &check).await {
        Ok(output) => {
            let bytes = output.len();
            if deps.store.complete(task_id, output) {
                info!(worker_id, task_id = %task_id, bytes, "task completed");
            } else {
                debug!(worker_id, task_id = %task_id, "result discarded, task no longer active");
            }
        }
        Err(ProcessError::Cancelled) => {
            info!(worker_id, task_id = %task_id, "processing abandoned after cancellation");
        }
        Err(ProcessError::Failed(description)) => {
            warn!(worker_id, task_id = %task_id, error = %description, "task failed");
            deps.store.fail(task_id, description);
        }
    }
}

async fn process(
    deps: &WorkerDeps,
    payload: ImagePayload,
    check: &CancelCheck<'_>,
) -> Result<Vec<u8>, ProcessError> {
    check.ensure_active()?;

    let input = match payload {
        ImagePayload::Inline(bytes) => bytes,
        ImagePayload::Remote(url) => deps
            .fetcher
            .fetch(&url)
            .await
            .map_err(|e| ProcessError::Failed(format!("failed to fetch image: {e}")))?,
    };
    check.ensure_active()?;

    // input is moved into the closure and dropped when the call returns
    let enhancer = Arc::clone(&deps.enhancer);
    let joined = tokio::task::spawn_blocking(move || enhancer.enhance(&input)).await;
    let output = match joined {
        Ok(Ok(output)) => output,
        Ok(Err(err)) => return Err(ProcessError::Failed(err.to_string())),
        Err(err) if err.is_panic() => {
            return Err(ProcessError::Failed("enhancer panicked".to_string()));
        }
        Err(err) => return Err(ProcessError::Failed(format!("enhancer task aborted: {err}"))),
    };

    check.ensure_active()?;
    Ok(output)
}
