//! Frontend errors.

use std::fmt::Display;

use thiserror::Error;

use super::executor::multi_shard;

/// Error returned by [`super::Executor::execute`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("query has no route")]
    NoRoute,

    #[error("{0}")]
    PartialScatter(#[from] PartialScatterError),

    #[error("{0}")]
    Backend(#[from] crate::backend::Error),

    #[error("query canceled")]
    Canceled,

    #[error("query timeout")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("{0}")]
    Router(#[from] super::router::Error),

    #[error("{0}")]
    MultiShard(#[from] multi_shard::Error),
}

impl Error {
    /// Caller stopped waiting, either explicitly or because of the timeout.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Canceled | Self::Timeout(_))
    }
}

/// One shard's failure during a scatter execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardFailure {
    pub shard: usize,
    pub error: crate::backend::Error,
}

/// One or more shards failed while executing a scatter query.
///
/// Shards that succeeded are listed so the caller knows exactly
/// which part of the result is missing.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialScatterError {
    failed: Vec<ShardFailure>,
    succeeded: Vec<usize>,
}

impl PartialScatterError {
    pub fn new(failed: Vec<ShardFailure>, succeeded: Vec<usize>) -> Self {
        Self { failed, succeeded }
    }

    /// Per-shard errors, in shard list order.
    pub fn failed(&self) -> &[ShardFailure] {
        &self.failed
    }

    pub fn failed_shards(&self) -> Vec<usize> {
        self.failed.iter().map(|f| f.shard).collect()
    }

    /// Shards that returned rows.
    pub fn succeeded(&self) -> &[usize] {
        &self.succeeded
    }

    /// Number of shards the query was sent to.
    pub fn shards(&self) -> usize {
        self.failed.len() + self.succeeded.len()
    }
}

impl Display for PartialScatterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "scatter query failed on {} of {} shards",
            self.failed.len(),
            self.shards()
        )?;

        for (i, failure) in self.failed.iter().enumerate() {
            let separator = if i == 0 { ": " } else { ", " };
            write!(f, "{}[{}] {}", separator, failure.shard, failure.error)?;
        }

        Ok(())
    }
}

impl std::error::Error for PartialScatterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failed
            .first()
            .map(|f| &f.error as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::backend::Error as BackendError;

    #[test]
    fn test_partial_scatter_display() {
        let err = PartialScatterError::new(
            vec![
                ShardFailure {
                    shard: 1,
                    error: BackendError::shard(1, "relation \"user\" does not exist"),
                },
                ShardFailure {
                    shard: 3,
                    error: BackendError::Unavailable(3),
                },
            ],
            vec![0, 2],
        );

        assert_eq!(err.shards(), 4);
        assert_eq!(err.failed_shards(), vec![1, 3]);
        assert_eq!(
            err.to_string(),
            "scatter query failed on 2 of 4 shards: [1] shard 1: relation \"user\" does not exist, [3] shard 3 is unavailable"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_cancellation() {
        assert!(Error::Canceled.is_cancellation());
        assert!(!Error::NoRoute.is_cancellation());
    }
}
