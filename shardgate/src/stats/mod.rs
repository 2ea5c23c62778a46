//! Statistics.
pub mod http_server;
pub mod open_metric;
pub mod report;
pub mod scatter;
pub mod scatter_metrics;

pub use open_metric::*;
pub use scatter::{Error, ScatterEntry, ScatterStats};
pub use scatter_metrics::ScatterStatsMetrics;
