//! OpenMetrics text format.

use std::fmt::Display;
use std::ops::Deref;
use std::time::Duration;

/// A metric that can be rendered in the OpenMetrics format.
pub trait OpenMetric: Send + Sync {
    fn name(&self) -> String;
    /// Samples, one per label set.
    fn measurements(&self) -> Vec<Measurement>;
    fn unit(&self) -> Option<String> {
        None
    }
    fn metric_type(&self) -> String {
        "gauge".into()
    }
    fn help(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementType {
    Float(f64),
    Integer(i64),
    Millis(u128),
}

impl From<usize> for MeasurementType {
    fn from(value: usize) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<f64> for MeasurementType {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Duration> for MeasurementType {
    fn from(value: Duration) -> Self {
        Self::Millis(value.as_millis())
    }
}

impl Display for MeasurementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Float(value) => write!(f, "{:.3}", value),
            Self::Integer(value) => write!(f, "{}", value),
            Self::Millis(value) => write!(f, "{}", value),
        }
    }
}

/// One sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub labels: Vec<(String, String)>,
    pub measurement: MeasurementType,
}

impl Measurement {
    fn render(&self, name: &str) -> String {
        let labels = self
            .labels
            .iter()
            .map(|(label, value)| format!("{}=\"{}\"", label, escape(value)))
            .collect::<Vec<_>>();

        if labels.is_empty() {
            format!("{} {}", name, self.measurement)
        } else {
            format!("{}{{{}}} {}", name, labels.join(","), self.measurement)
        }
    }
}

fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Type-erased metric.
pub struct Metric {
    metric: Box<dyn OpenMetric>,
}

impl Metric {
    pub fn new(metric: impl OpenMetric + 'static) -> Self {
        Self {
            metric: Box::new(metric),
        }
    }
}

impl Deref for Metric {
    type Target = Box<dyn OpenMetric>;

    fn deref(&self) -> &Self::Target {
        &self.metric
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.name();
        writeln!(f, "# TYPE {} {}", name, self.metric_type())?;
        if let Some(unit) = self.unit() {
            writeln!(f, "# UNIT {} {}", name, unit)?;
        }
        if let Some(help) = self.help() {
            writeln!(f, "# HELP {} {}", name, help)?;
        }

        for measurement in self.measurements() {
            writeln!(f, "{}", measurement.render(&name))?;
        }

        Ok(())
    }
}
