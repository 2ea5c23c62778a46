//! Scatter stats OpenMetrics.

use shardgate_stats::ScatterStatsSnapshot;

use super::{Measurement, MeasurementType, Metric, OpenMetric};

pub struct ScatterStatsMetrics;

impl ScatterStatsMetrics {
    pub fn load(snapshot: &ScatterStatsSnapshot) -> Vec<Metric> {
        let mut count = vec![];
        let mut errors = vec![];
        let mut time = vec![];

        for entry in snapshot.entries() {
            let labels = vec![
                ("query".to_string(), entry.shape().to_string()),
                ("plan".to_string(), entry.label().to_string()),
            ];

            count.push(Measurement {
                labels: labels.clone(),
                measurement: entry.stats.count.into(),
            });

            errors.push(Measurement {
                labels: labels.clone(),
                measurement: entry.stats.errors.into(),
            });

            time.push(Measurement {
                labels,
                measurement: entry.stats.time.into(),
            });
        }

        let totals = snapshot.totals();

        vec![
            Metric::new(ScatterStatsMetric {
                name: "scatter_queries_total".into(),
                help: "Scatter executions by query shape and plan.".into(),
                measurements: count,
                counter: true,
            }),
            Metric::new(ScatterStatsMetric {
                name: "scatter_query_errors_total".into(),
                help: "Scatter executions that returned an error.".into(),
                measurements: errors,
                counter: true,
            }),
            Metric::new(ScatterStatsMetric {
                name: "scatter_query_time_ms".into(),
                help: "Time spent executing scatter queries, in milliseconds.".into(),
                measurements: time,
                counter: true,
            }),
            Metric::new(ScatterStatsMetric {
                name: "queries_direct".into(),
                help: "Queries sent directly to a single shard.".into(),
                measurements: vec![Measurement {
                    labels: vec![],
                    measurement: MeasurementType::from(totals.direct),
                }],
                counter: true,
            }),
            Metric::new(ScatterStatsMetric {
                name: "queries_scatter".into(),
                help: "Queries sent to multiple or all shards.".into(),
                measurements: vec![Measurement {
                    labels: vec![],
                    measurement: MeasurementType::from(totals.scatter),
                }],
                counter: true,
            }),
            Metric::new(ScatterStatsMetric {
                name: "scatter_query_shapes".into(),
                help: "Distinct scatter query shapes.".into(),
                measurements: vec![Measurement {
                    labels: vec![],
                    measurement: MeasurementType::from(snapshot.len()),
                }],
                counter: false,
            }),
        ]
    }
}

struct ScatterStatsMetric {
    name: String,
    help: String,
    measurements: Vec<Measurement>,
    counter: bool,
}

impl OpenMetric for ScatterStatsMetric {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn measurements(&self) -> Vec<Measurement> {
        self.measurements.clone()
    }

    fn help(&self) -> Option<String> {
        Some(self.help.clone())
    }

    fn metric_type(&self) -> String {
        if self.counter {
            "counter".into()
        } else {
            "gauge".into()
        }
    }
}

#[cfg(test)]
mod test {
    use shardgate_stats::{QueryTotals, ScatterKey, ScatterStats, ScatterStatsEntry};

    use super::*;

    #[test]
    fn test_scatter_metrics() {
        let snapshot = ScatterStatsSnapshot::new(
            vec![ScatterStatsEntry {
                key: ScatterKey::new("select * from user", "scatter-select"),
                stats: ScatterStats {
                    count: 3,
                    errors: 1,
                    ..ScatterStats::new()
                },
            }],
            QueryTotals {
                direct: 5,
                scatter: 3,
            },
        );

        let metrics = ScatterStatsMetrics::load(&snapshot);
        let names: Vec<_> = metrics.iter().map(|m| m.name()).collect();
        assert_eq!(
            names,
            vec![
                "scatter_queries_total",
                "scatter_query_errors_total",
                "scatter_query_time_ms",
                "queries_direct",
                "queries_scatter",
                "scatter_query_shapes",
            ]
        );

        let rendered = metrics[0].to_string();
        assert!(rendered
            .contains(r#"scatter_queries_total{query="select * from user",plan="scatter-select"} 3"#));
        assert!(metrics[3].to_string().contains("queries_direct 5"));
        assert_eq!(metrics[5].metric_type(), "gauge");
    }

    #[test]
    fn test_empty_snapshot_metrics() {
        let metrics = ScatterStatsMetrics::load(&ScatterStatsSnapshot::default());
        assert!(metrics[0].measurements().is_empty());
        assert!(metrics[0].to_string().starts_with("# TYPE scatter_queries_total counter"));
    }
}
