//! Scatter query statistics, as seen by the reporting surfaces.

use std::ops::Add;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

/// Statistics key: a canonical statement shape and the plan label it executed with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScatterKey {
    /// Normalized statement text.
    pub shape: String,
    /// Structural label, e.g. "scatter-select".
    pub label: String,
}

impl ScatterKey {
    pub fn new(shape: impl ToString, label: impl ToString) -> Self {
        Self {
            shape: shape.to_string(),
            label: label.to_string(),
        }
    }
}

/// Counters for one query shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScatterStats {
    /// Number of scatter executions.
    pub count: usize,
    /// Executions that returned an error.
    pub errors: usize,
    /// Executions that finished, with or without an error.
    pub completed: usize,
    /// Total time spent on completed executions.
    pub time: Duration,
    /// First time this shape was recorded.
    pub first_seen: SystemTime,
    /// Last time this shape was recorded.
    pub last_seen: SystemTime,
}

impl ScatterStats {
    /// Stats for a shape seen for the first time.
    pub fn new() -> Self {
        let now = SystemTime::now();
        Self {
            count: 1,
            errors: 0,
            completed: 0,
            time: Duration::ZERO,
            first_seen: now,
            last_seen: now,
        }
    }

    /// Average execution time.
    pub fn avg_time(&self) -> Duration {
        if self.completed == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(self.time.as_secs_f64() / self.completed as f64)
        }
    }
}

impl Default for ScatterStats {
    fn default() -> Self {
        Self::new()
    }
}

impl Add for ScatterStats {
    type Output = ScatterStats;

    fn add(self, rhs: Self) -> Self::Output {
        ScatterStats {
            count: self.count.saturating_add(rhs.count),
            errors: self.errors.saturating_add(rhs.errors),
            completed: self.completed.saturating_add(rhs.completed),
            time: self.time.saturating_add(rhs.time),
            first_seen: self.first_seen.min(rhs.first_seen),
            last_seen: self.last_seen.max(rhs.last_seen),
        }
    }
}

/// One row of the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterStatsEntry {
    pub key: ScatterKey,
    pub stats: ScatterStats,
}

impl ScatterStatsEntry {
    pub fn shape(&self) -> &str {
        &self.key.shape
    }

    pub fn label(&self) -> &str {
        &self.key.label
    }

    pub fn count(&self) -> usize {
        self.stats.count
    }
}

/// Executions seen by the coordinator, scatter or not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTotals {
    /// Executions routed to exactly one shard.
    pub direct: usize,
    /// Executions routed to more than one shard.
    pub scatter: usize,
}

impl QueryTotals {
    pub fn total(&self) -> usize {
        self.direct.saturating_add(self.scatter)
    }
}

/// Point-in-time copy of all scatter statistics, ordered by key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScatterStatsSnapshot {
    entries: Vec<ScatterStatsEntry>,
    totals: QueryTotals,
    taken_at: Option<SystemTime>,
}

impl ScatterStatsSnapshot {
    /// Build a snapshot. Entries are sorted by key.
    pub fn new(mut entries: Vec<ScatterStatsEntry>, totals: QueryTotals) -> Self {
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Self {
            entries,
            totals,
            taken_at: Some(SystemTime::now()),
        }
    }

    pub fn entries(&self) -> &[ScatterStatsEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn totals(&self) -> &QueryTotals {
        &self.totals
    }

    pub fn taken_at(&self) -> Option<SystemTime> {
        self.taken_at
    }

    /// Sum of all entry counts.
    pub fn scatter_count(&self) -> usize {
        self.entries.iter().map(|e| e.stats.count).sum()
    }

    /// Sum of all completed scatter execution time.
    pub fn scatter_time(&self) -> Duration {
        self.entries
            .iter()
            .fold(Duration::ZERO, |acc, e| acc.saturating_add(e.stats.time))
    }

    /// Find entry by shape and label.
    pub fn get(&self, shape: &str, label: &str) -> Option<&ScatterStatsEntry> {
        self.entries
            .iter()
            .find(|e| e.key.shape == shape && e.key.label == label)
    }

    /// Share of all executions this entry accounts for, in percent.
    pub fn percent_count(&self, entry: &ScatterStatsEntry) -> f64 {
        let total = self.totals.total().max(self.scatter_count());
        if total == 0 {
            0.0
        } else {
            entry.stats.count as f64 * 100.0 / total as f64
        }
    }

    /// Share of all scatter time this entry accounts for, in percent.
    pub fn percent_time(&self, entry: &ScatterStatsEntry) -> f64 {
        let total = self.scatter_time();
        if total.is_zero() {
            0.0
        } else {
            entry.stats.time.as_secs_f64() * 100.0 / total.as_secs_f64()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn entry(shape: &str, label: &str, count: usize, millis: u64) -> ScatterStatsEntry {
        ScatterStatsEntry {
            key: ScatterKey::new(shape, label),
            stats: ScatterStats {
                count,
                completed: count,
                time: Duration::from_millis(millis),
                ..ScatterStats::new()
            },
        }
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let snapshot = ScatterStatsSnapshot::new(
            vec![
                entry("select * from user", "scatter-select", 1, 10),
                entry("select * from account", "scatter-select", 1, 10),
                entry("select * from account", "scatter-join", 1, 10),
            ],
            QueryTotals::default(),
        );

        let keys: Vec<_> = snapshot
            .entries()
            .iter()
            .map(|e| (e.shape(), e.label()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("select * from account", "scatter-join"),
                ("select * from account", "scatter-select"),
                ("select * from user", "scatter-select"),
            ]
        );
    }

    #[test]
    fn test_percentages() {
        let snapshot = ScatterStatsSnapshot::new(
            vec![entry("a", "scatter-select", 3, 30), entry("b", "scatter-select", 1, 10)],
            QueryTotals {
                direct: 4,
                scatter: 4,
            },
        );

        assert_eq!(snapshot.scatter_count(), 4);
        let a = snapshot.get("a", "scatter-select").unwrap();
        assert_eq!(snapshot.percent_count(a), 37.5);
        assert!((snapshot.percent_time(a) - 75.0).abs() < 1e-9);
        assert_eq!(a.stats.avg_time(), Duration::from_millis(10));
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = ScatterStatsSnapshot::default();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.scatter_time(), Duration::ZERO);
        assert!(snapshot.taken_at().is_none());
    }

    #[test]
    fn test_add_stats() {
        let a = ScatterStats::new();
        let b = ScatterStats {
            errors: 1,
            ..ScatterStats::new()
        };
        let sum = a + b;
        assert_eq!(sum.count, 2);
        assert_eq!(sum.errors, 1);
        assert!(sum.first_seen <= sum.last_seen);
    }

    #[test]
    fn test_avg_time() {
        let mut stats = ScatterStats::new();
        assert_eq!(stats.avg_time(), Duration::ZERO);

        stats.completed = 4;
        stats.time = Duration::from_millis(10);
        assert_eq!(stats.avg_time().as_micros(), 2500);

        stats.completed = 1 << 32;
        stats.time = Duration::from_secs(1 << 32);
        assert_eq!(stats.avg_time().as_secs(), 1);
    }

    #[test]
    fn test_snapshot_serializes() {
        let snapshot =
            ScatterStatsSnapshot::new(vec![entry("a", "scatter-select", 2, 4)], QueryTotals::default());
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("scatter-select"));
    }
}
