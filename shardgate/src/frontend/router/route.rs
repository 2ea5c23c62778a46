use std::fmt::Display;

use shardgate_stats::{ExecutionPlanDescriptor, PlanKind};

/// Shards a statement is sent to, and how it was classified.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    shards: Vec<usize>,
    plan: ExecutionPlanDescriptor,
}

impl Route {
    /// Create route. Plan kind is derived from the number of shards.
    pub fn new(shards: Vec<usize>, label: impl ToString) -> Self {
        let plan = ExecutionPlanDescriptor::new(label, shards.len());
        Self { shards, plan }
    }

    /// Route to exactly one shard.
    pub fn direct(shard: usize, label: impl ToString) -> Self {
        Self::new(vec![shard], label)
    }

    /// Route to every shard in a cluster of `shards` shards.
    pub fn all(shards: usize, label: impl ToString) -> Self {
        Self::new((0..shards).collect(), label)
    }

    /// Shards, in execution order.
    pub fn shards(&self) -> &[usize] {
        &self.shards
    }

    pub fn plan(&self) -> &ExecutionPlanDescriptor {
        &self.plan
    }

    pub fn kind(&self) -> PlanKind {
        self.plan.kind
    }

    /// Returns true if this query should be sent to
    /// more than one shard.
    pub fn is_cross_shard(&self) -> bool {
        self.plan.is_scatter()
    }

    /// Resolver found nowhere to send this.
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "shards={:?}, plan={}", self.shards, self.plan)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_route_kind() {
        assert_eq!(Route::direct(3, "select").kind(), PlanKind::Single);
        assert_eq!(Route::all(4, "scatter-select").kind(), PlanKind::Scatter);
        assert_eq!(Route::all(4, "scatter-select").shards(), &[0, 1, 2, 3]);
        // A single-shard cluster never scatters.
        assert!(!Route::all(1, "scatter-select").is_cross_shard());
        assert!(Route::new(vec![], "select").is_empty());
    }

    #[test]
    fn test_route_display() {
        let route = Route::new(vec![1, 2], "scatter-join");
        assert_eq!(
            route.to_string(),
            "shards=[1, 2], plan=scatter-join (scatter)"
        );
    }
}
