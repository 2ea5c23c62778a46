//! Human-readable scatter statistics report.

use std::fmt::Display;
use std::io::Write;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use shardgate_stats::ScatterStatsSnapshot;

/// Report title. Always present, even if there is nothing to report.
pub const TITLE: &str = "Scatter Query Statistics";

const HEADER: [&str; 8] = [
    "Query",
    "Plan",
    "Count",
    "Errors",
    "Avg Time (ms)",
    "% Time",
    "% Count",
    "Last Seen",
];

fn timestamp(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string()
}

/// Scatter statistics report, rendered with [`Display`].
pub struct Report<'a> {
    snapshot: &'a ScatterStatsSnapshot,
}

impl<'a> Report<'a> {
    pub fn new(snapshot: &'a ScatterStatsSnapshot) -> Self {
        Self { snapshot }
    }

    fn rows(&self) -> Vec<[String; 8]> {
        self.snapshot
            .entries()
            .iter()
            .map(|entry| {
                [
                    entry.shape().to_string(),
                    entry.label().to_string(),
                    entry.stats.count.to_string(),
                    entry.stats.errors.to_string(),
                    format!("{:.3}", entry.stats.avg_time().as_secs_f64() * 1000.0),
                    format!("{:.2}", self.snapshot.percent_time(entry)),
                    format!("{:.2}", self.snapshot.percent_count(entry)),
                    timestamp(entry.stats.last_seen),
                ]
            })
            .collect()
    }
}

impl Display for Report<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", TITLE)?;
        writeln!(f, "{}", "=".repeat(TITLE.len()))?;
        writeln!(f)?;

        if let Some(taken_at) = self.snapshot.taken_at() {
            writeln!(f, "Taken at: {}", timestamp(taken_at))?;
        }

        let totals = self.snapshot.totals();
        writeln!(
            f,
            "Executions: {} ({} direct, {} scatter), {} scatter query shape(s)",
            totals.total(),
            totals.direct,
            totals.scatter,
            self.snapshot.len()
        )?;
        writeln!(f)?;

        if self.snapshot.is_empty() {
            return writeln!(f, "No scatter queries recorded.");
        }

        let rows = self.rows();
        let mut widths = HEADER.map(|h| h.len());
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        // Text columns are left-aligned, numbers right-aligned.
        let line = |f: &mut std::fmt::Formatter<'_>, cells: &[&str]| -> std::fmt::Result {
            let cells: Vec<String> = cells
                .iter()
                .zip(widths.iter())
                .enumerate()
                .map(|(i, (cell, width))| match i {
                    2..=6 => format!("{:>width$}", cell, width = *width),
                    _ => format!("{:<width$}", cell, width = *width),
                })
                .collect();
            writeln!(f, "{}", cells.join(" | ").trim_end())
        };

        line(f, &HEADER)?;
        let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(f, "{}", separator.join("-+-"))?;

        for row in &rows {
            let cells: Vec<&str> = row.iter().map(|c| c.as_str()).collect();
            line(f, &cells)?;
        }

        Ok(())
    }
}

/// Render the snapshot as text.
pub fn render(snapshot: &ScatterStatsSnapshot) -> String {
    Report::new(snapshot).to_string()
}

/// Write the rendered snapshot to `sink`.
pub fn write(sink: &mut impl Write, snapshot: &ScatterStatsSnapshot) -> std::io::Result<()> {
    sink.write_all(render(snapshot).as_bytes())
}
