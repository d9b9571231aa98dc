//! ReaperLoop - 処理タイムアウトの強制と古いレコードの回収
//!
//! # フロー
//! 1. reaper_interval ごとに TaskStore::sweep(clock.now()) を呼ぶ
//! 2. Processing のまま timeout_for(size_hint) を超えたタスク → Cancelled
//! 3. retention を過ぎた終端タスク → 削除
//! 4. max_tracked を超えた分 → 古い順に削除

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::store::{RetentionPolicy, SweepReport, TaskStore};

pub struct ReaperLoop {
    store: Arc<TaskStore>,
    interval: Duration,
    policy: RetentionPolicy,
}

impl ReaperLoop {
    /// `interval` must be non-zero.
    pub fn new(store: Arc<TaskStore>, interval: Duration, policy: RetentionPolicy) -> Self {
        Self {
            store,
            interval,
            policy,
        }
    }

    /// One sweep at the store clock's current time.
    pub fn run_once(&self) -> SweepReport {
        let report = self.store.sweep(self.store.now(), &self.policy);

        for task_id in &report.timed_out {
            warn!(task_id = %task_id, "processing timed out, task cancelled");
        }
        if report.is_empty() {
            debug!(tracked = self.store.len(), "sweep found nothing to do");
        } else {
            info!(
                timed_out = report.timed_out.len(),
                expired = report.expired.len(),
                evicted = report.evicted.len(),
                tracked = self.store.len(),
                "sweep finished"
            );
        }
        report
    }

    /// Run on a background task until the handle is shut down.
    /// The first sweep happens one interval after spawning.
    pub fn spawn(self) -> ReaperHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(self.run(shutdown_rx));
        ReaperHandle { shutdown_tx, join }
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs_f64(), "reaper started");

        loop {
            if *shutdown_rx.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.run_once();
                }
            }
        }
        info!("reaper stopped");
    }
}

pub struct ReaperHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ReaperHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(err) = self.join.await {
            warn!(error = %err, "reaper ended abnormally");
        }
    }
}
