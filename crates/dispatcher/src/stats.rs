use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use metrics::{counter, gauge};
use serde::Serialize;

/// 分发器计数快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub submitted: u64,
    pub completed: u64,
    /// 处理函数异常终止的任务数，已计入 `completed`
    pub panicked: u64,
    pub in_flight: usize,
    pub peak_in_flight: usize,
}

impl DispatchStats {
    pub fn is_drained(&self) -> bool {
        self.submitted == self.completed
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    panicked: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Counters {
    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        counter!("shellz_dispatcher_jobs_submitted_total").increment(1);
    }

    pub(crate) fn record_started(&self) {
        let active = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(active, Ordering::SeqCst);
        gauge!("shellz_dispatcher_jobs_in_flight").set(active as f64);
    }

    // completed 最后递增：观察到 submitted == completed 时不再有任务在运行
    pub(crate) fn record_finished(&self, panicked: bool) {
        let active = self.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        gauge!("shellz_dispatcher_jobs_in_flight").set(active as f64);
        if panicked {
            self.panicked.fetch_add(1, Ordering::SeqCst);
            counter!("shellz_dispatcher_jobs_panicked_total").increment(1);
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        counter!("shellz_dispatcher_jobs_completed_total").increment(1);
    }

    pub(crate) fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            submitted: self.submitted.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
            panicked: self.panicked.load(Ordering::SeqCst),
            in_flight: self.in_flight.load(Ordering::SeqCst),
            peak_in_flight: self.peak_in_flight.load(Ordering::SeqCst),
        }
    }
}
