//! Runtime configuration for the task manager, worker pool and reaper.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::RetentionPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Number of workers. Fixed for the life of the process.
    pub workers: usize,

    /// How long a worker waits on an empty queue before re-checking shutdown.
    pub poll_interval_ms: u64,

    pub reaper_interval_secs: u64,

    /// Terminal tasks older than this are deleted by the reaper.
    pub retention_secs: u64,

    /// Soft cap on tracked task records.
    pub max_tracked_tasks: usize,

    /// Timeout for fetching remote images.
    pub fetch_timeout_secs: u64,

    /// Largest remote image body a worker will download.
    pub max_fetch_bytes: u64,

    /// Reject submissions with `ServiceBusy` once this many tasks are queued.
    /// `None` means unbounded.
    pub queue_capacity: Option<usize>,

    /// Scale factor of the default upscaler.
    pub upscale_factor: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            poll_interval_ms: 1000,
            reaper_interval_secs: 30,
            retention_secs: 180,
            max_tracked_tasks: 50,
            fetch_timeout_secs: 20,
            max_fetch_bytes: 32 * 1024 * 1024,
            queue_capacity: None,
            upscale_factor: 2,
        }
    }
}

impl ServiceConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            retention: Duration::from_secs(self.retention_secs),
            max_tracked: self.max_tracked_tasks,
        }
    }
}
