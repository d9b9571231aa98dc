//! Sweep: timeout enforcement and garbage collection of task records.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{TaskId, TaskRecord, TaskStatus, timeout_for};

/// How long records live and how many are kept.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    /// Terminal records older than this are deleted.
    pub retention: Duration,

    /// Soft cap on the number of records kept after a sweep.
    pub max_tracked: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(180),
            max_tracked: 50,
        }
    }
}

/// What one sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Processing tasks cancelled for exceeding their timeout.
    pub timed_out: Vec<TaskId>,

    /// Terminal tasks deleted for exceeding the retention window.
    pub expired: Vec<TaskId>,

    /// Tasks deleted to get back under the cap.
    pub evicted: Vec<TaskId>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.timed_out.is_empty() && self.expired.is_empty() && self.evicted.is_empty()
    }
}

pub(super) fn sweep(
    tasks: &mut HashMap<TaskId, TaskRecord>,
    now: DateTime<Utc>,
    policy: &RetentionPolicy,
) -> SweepReport {
    let mut report = SweepReport::default();

    // 1) Processing tasks past their timeout are cancelled.
    for record in tasks.values_mut() {
        if record.status == TaskStatus::Processing
            && record.age(now) > timeout_for(record.size_hint)
            && record.cancel()
        {
            report.timed_out.push(record.id);
        }
    }

    // 2) Old terminal tasks are deleted. Tasks timed out just now survive until
    //    the next sweep so pollers can observe the cancellation.
    let just_timed_out: HashSet<TaskId> = report.timed_out.iter().copied().collect();
    tasks.retain(|id, record| {
        let expired = record.status.is_terminal()
            && record.age(now) > policy.retention
            && !just_timed_out.contains(id);
        if expired {
            report.expired.push(*id);
        }
        !expired
    });

    // 3) Oldest records beyond the cap go, whatever their status.
    if tasks.len() > policy.max_tracked {
        let mut by_age: Vec<(DateTime<Utc>, TaskId)> =
            tasks.values().map(|r| (r.created_at, r.id)).collect();
        by_age.sort_unstable();
        let excess = tasks.len() - policy.max_tracked;
        for (_, id) in by_age.into_iter().take(excess) {
            tasks.remove(&id);
            report.evicted.push(id);
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TaskStore;
    use crate::ports::{Clock, FixedClock};
    use chrono::TimeZone;
    use std::sync::Arc;
    use ulid::Ulid;

    const MP: u64 = 1_048_576;

    struct Fixture {
        clock: Arc<FixedClock>,
        store: TaskStore,
        policy: RetentionPolicy,
    }

    fn fixture() -> Fixture {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(start));
        let store = TaskStore::new(clock.clone());
        Fixture {
            clock,
            store,
            policy: RetentionPolicy::default(),
        }
    }

    fn new_id() -> TaskId {
        TaskId::from_ulid(Ulid::new())
    }

    impl Fixture {
        fn processing(&self, size_hint: Option<u64>) -> TaskId {
            let id = new_id();
            self.store.create(id, size_hint).unwrap();
            self.store.set_status(id, TaskStatus::Processing);
            id
        }

        fn completed(&self) -> TaskId {
            let id = self.processing(None);
            self.store.complete(id, vec![1]);
            id
        }

        fn advance(&self, secs: u64) {
            self.clock.advance(Duration::from_secs(secs));
        }

        fn sweep(&self) -> SweepReport {
            self.store.sweep(self.clock.now(), &self.policy)
        }
    }

    #[test]
    fn stuck_processing_task_is_cancelled_after_timeout() {
        let f = fixture();
        // 1.5 MP -> 30s timeout
        let id = f.processing(Some(MP * 3 / 2));

        f.advance(30);
        assert!(f.sweep().timed_out.is_empty());
        assert_eq!(f.store.status(id), Some(TaskStatus::Processing));

        f.advance(1);
        let report = f.sweep();
        assert_eq!(report.timed_out, vec![id]);
        assert_eq!(f.store.status(id), Some(TaskStatus::Cancelled));
        assert!(f.store.is_cancelled(id));
    }

    #[test]
    fn pending_tasks_are_never_timed_out() {
        let f = fixture();
        let id = new_id();
        f.store.create(id, Some(MP)).unwrap();

        f.advance(170);
        assert!(f.sweep().is_empty());
        assert_eq!(f.store.status(id), Some(TaskStatus::Pending));
    }

    #[test]
    fn large_timeout_cancellation_is_visible_until_next_sweep() {
        let f = fixture();
        // 9 MP -> 300s timeout, longer than the 180s retention window
        let id = f.processing(Some(9 * MP));

        f.advance(301);
        let report = f.sweep();
        assert_eq!(report.timed_out, vec![id]);
        assert!(report.expired.is_empty());
        assert_eq!(f.store.status(id), Some(TaskStatus::Cancelled));

        f.advance(30);
        let report = f.sweep();
        assert_eq!(report.expired, vec![id]);
        assert_eq!(f.store.status(id), None);
    }

    #[test]
    fn terminal_tasks_expire_after_retention() {
        let f = fixture();
        let old = f.completed();
        f.advance(100);
        let young = f.completed();

        f.advance(81);
        let report = f.sweep();
        assert_eq!(report.expired, vec![old]);
        assert_eq!(f.store.status(old), None);
        assert_eq!(f.store.status(young), Some(TaskStatus::Completed));
    }

    #[test]
    fn live_tasks_are_not_expired() {
        let f = fixture();
        let pending = new_id();
        f.store.create(pending, None).unwrap();

        f.advance(1000);
        let report = f.sweep();
        assert!(report.expired.is_empty());
        assert_eq!(f.store.status(pending), Some(TaskStatus::Pending));
    }

    #[test]
    fn cap_keeps_the_most_recent_records() {
        let f = fixture();
        let mut ids = Vec::new();
        for _ in 0..55 {
            ids.push(f.completed());
            f.advance(1);
        }

        let report = f.sweep();
        assert_eq!(report.evicted, ids[..5].to_vec());
        assert_eq!(f.store.len(), 50);
        for id in &ids[..5] {
            assert_eq!(f.store.status(*id), None);
        }
        for id in &ids[5..] {
            assert_eq!(f.store.status(*id), Some(TaskStatus::Completed));
        }
    }

    #[test]
    fn cap_applies_regardless_of_status() {
        let f = fixture();
        let oldest = new_id();
        f.store.create(oldest, None).unwrap();
        f.advance(1);
        for _ in 0..50 {
            f.completed();
        }

        let report = f.sweep();
        assert_eq!(report.evicted, vec![oldest]);
        assert_eq!(f.store.len(), 50);
    }

    #[test]
    fn under_cap_nothing_is_evicted() {
        let f = fixture();
        for _ in 0..50 {
            f.completed();
        }
        assert!(f.sweep().evicted.is_empty());
        assert_eq!(f.store.len(), 50);
    }
}
