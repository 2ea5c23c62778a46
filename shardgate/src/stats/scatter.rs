//! Scatter query statistics.
//!
//! Shared between all clients executing through the same gateway.

use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use fnv::FnvHashMap;
use parking_lot::Mutex;
use shardgate_stats::{
    ExecutionPlanDescriptor, QueryTotals, ScatterKey, ScatterStats as Stats, ScatterStatsEntry,
    ScatterStatsSnapshot,
};
use thiserror::Error;

use crate::frontend::router::CanonicalShape;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("\"{0}\" is not a scatter plan")]
    NotScatter(String),

    #[error("scatter stats entry \"{0}\" has no executions")]
    EmptyEntry(String),
}

/// Handle to one entry, used to add timing once the execution is done.
#[derive(Debug, Clone)]
pub struct ScatterEntry {
    stats: Arc<Mutex<Stats>>,
}

impl ScatterEntry {
    /// Account for a finished execution. The count is not changed.
    pub fn finish(&self, elapsed: Duration, ok: bool) {
        let mut guard = self.stats.lock();
        guard.completed += 1;
        guard.time += elapsed;
        if !ok {
            guard.errors += 1;
        }
    }

    /// Current counters.
    pub fn stats(&self) -> Stats {
        *self.stats.lock()
    }
}

/// Entries, by key. Entry counts only change while this is locked.
#[derive(Debug, Default)]
struct Inner {
    entries: FnvHashMap<ScatterKey, ScatterEntry>,
}

/// Scatter query statistics.
///
/// Cheap to clone; clones share the same entries. Entries live as long as
/// the statistics do.
// TODO: cap the number of shapes with an LRU if unparameterized queries
// turn out to blow up the key space.
#[derive(Debug, Clone, Default)]
pub struct ScatterStats {
    inner: Arc<Mutex<Inner>>,
}

impl ScatterStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one scatter execution of `shape`.
    pub fn record(
        &self,
        shape: &CanonicalShape,
        plan: &ExecutionPlanDescriptor,
    ) -> Result<ScatterEntry, Error> {
        if !plan.is_scatter() {
            return Err(Error::NotScatter(plan.label.clone()));
        }

        let key = ScatterKey::new(shape, &plan.label);
        let now = SystemTime::now();

        let mut guard = self.inner.lock();
        match guard.entries.entry(key) {
            Entry::Occupied(entry) => {
                let entry = entry.get().clone();
                {
                    let mut stats = entry.stats.lock();
                    stats.count += 1;
                    stats.last_seen = stats.last_seen.max(now);
                }
                Ok(entry)
            }

            Entry::Vacant(vacant) => {
                let entry = ScatterEntry {
                    stats: Arc::new(Mutex::new(Stats::new())),
                };
                vacant.insert(entry.clone());
                Ok(entry)
            }
        }
    }

    /// Number of distinct shapes.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Point-in-time copy of all entries.
    pub fn snapshot(&self) -> Result<ScatterStatsSnapshot, Error> {
        self.snapshot_with(QueryTotals::default())
    }

    /// Point-in-time copy of all entries, with execution totals attached.
    ///
    /// The lock is held only while copying; sorting happens after it's released.
    pub fn snapshot_with(&self, totals: QueryTotals) -> Result<ScatterStatsSnapshot, Error> {
        let entries: Vec<_> = {
            let guard = self.inner.lock();
            guard
                .entries
                .iter()
                .map(|(key, entry)| ScatterStatsEntry {
                    key: key.clone(),
                    stats: entry.stats(),
                })
                .collect()
        };

        if let Some(empty) = entries.iter().find(|e| e.stats.count == 0) {
            return Err(Error::EmptyEntry(empty.key.shape.clone()));
        }

        Ok(ScatterStatsSnapshot::new(entries, totals))
    }
}
