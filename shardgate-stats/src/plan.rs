use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// How many shards an execution touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    /// Exactly one shard.
    Single,
    /// More than one shard.
    Scatter,
}

impl PlanKind {
    /// Classify by the number of shards the statement resolved to.
    pub fn from_shards(shards: usize) -> Self {
        if shards > 1 {
            Self::Scatter
        } else {
            Self::Single
        }
    }

    pub fn is_scatter(&self) -> bool {
        matches!(self, Self::Scatter)
    }
}

impl Display for PlanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Scatter => write!(f, "scatter"),
        }
    }
}

/// Classification of one execution: its kind and a
/// human-readable structural label, e.g. "scatter-join".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExecutionPlanDescriptor {
    pub kind: PlanKind,
    pub label: String,
}

impl ExecutionPlanDescriptor {
    /// Create descriptor for a statement routed to `shards` shards.
    pub fn new(label: impl ToString, shards: usize) -> Self {
        Self {
            kind: PlanKind::from_shards(shards),
            label: label.to_string(),
        }
    }

    pub fn is_scatter(&self) -> bool {
        self.kind.is_scatter()
    }
}

impl Display for ExecutionPlanDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.label, self.kind)
    }
}
