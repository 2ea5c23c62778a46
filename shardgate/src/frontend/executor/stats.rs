//! Execution counters.

use std::sync::atomic::{AtomicUsize, Ordering};

use shardgate_stats::{PlanKind, QueryTotals};

/// Executions seen by the coordinator, split by plan kind.
#[derive(Debug, Default)]
pub struct Counters {
    direct: AtomicUsize,
    scatter: AtomicUsize,
}

impl Counters {
    /// Count one execution.
    pub fn add(&self, kind: PlanKind) {
        match kind {
            PlanKind::Single => self.direct.fetch_add(1, Ordering::Relaxed),
            PlanKind::Scatter => self.scatter.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn load(&self) -> QueryTotals {
        QueryTotals {
            direct: self.direct.load(Ordering::Relaxed),
            scatter: self.scatter.load(Ordering::Relaxed),
        }
    }
}
