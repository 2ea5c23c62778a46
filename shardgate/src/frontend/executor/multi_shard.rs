//! Multi-shard execution: fan out to every shard in the route
//! and merge the results.

use futures::future::join_all;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::backend::{self, BindVariables, Rows, ShardExecutor};
use crate::frontend::router::Route;
use crate::frontend::{PartialScatterError, ShardFailure};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("inconsistent row descriptions between shards: shard {shard} returned {actual} columns, expected {expected}")]
    InconsistentColumns {
        shard: usize,
        expected: usize,
        actual: usize,
    },

    #[error("inconsistent column names between shards: column {column} is \"{actual}\" on shard {shard}, expected \"{expected}\"")]
    InconsistentColumnNames {
        shard: usize,
        column: usize,
        expected: String,
        actual: String,
    },

    #[error("inconsistent column count in data rows on shard {shard}: expected {expected} columns, got {actual}")]
    InconsistentDataRow {
        shard: usize,
        expected: usize,
        actual: usize,
    },
}

/// Outcome of executing the statement on one shard.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardResult {
    pub shard: usize,
    pub result: Result<Rows, backend::Error>,
}

#[derive(Default, Debug)]
struct Counters {
    rows: usize,
    rows_affected: usize,
}

/// Multi-shard execution state.
#[derive(Debug)]
pub struct MultiShard<'a> {
    route: &'a Route,
    counters: Counters,
}

impl<'a> MultiShard<'a> {
    pub fn new(route: &'a Route) -> Self {
        Self {
            route,
            counters: Counters::default(),
        }
    }

    /// Send the statement to all shards concurrently and wait for all of them.
    ///
    /// Results are returned in route order, regardless of which shard finished first.
    pub async fn dispatch(
        &self,
        backend: &dyn ShardExecutor,
        token: &CancellationToken,
        sql: &str,
        binds: &BindVariables,
    ) -> Vec<ShardResult> {
        let futures = self.route.shards().iter().map(|&shard| async move {
            ShardResult {
                shard,
                result: backend.execute(token, shard, sql, binds).await,
            }
        });

        join_all(futures).await
    }

    /// Merge shard results into one result set.
    ///
    /// If any shard failed, the whole execution fails and the error
    /// lists every shard that failed and every shard that didn't.
    pub fn merge(mut self, results: Vec<ShardResult>) -> Result<Rows, crate::frontend::Error> {
        let mut failed = vec![];
        let mut succeeded = vec![];
        let mut rows = vec![];

        for result in results {
            match result.result {
                Ok(shard_rows) => {
                    succeeded.push(result.shard);
                    rows.push((result.shard, shard_rows));
                }
                Err(error) => {
                    warn!("shard {} failed: {} [{}]", result.shard, error, self.route);
                    failed.push(ShardFailure {
                        shard: result.shard,
                        error,
                    });
                }
            }
        }

        if !failed.is_empty() {
            return Err(PartialScatterError::new(failed, succeeded).into());
        }

        let mut merged: Option<Rows> = None;

        for (shard, shard_rows) in rows {
            self.counters.rows += shard_rows.len();
            self.counters.rows_affected += shard_rows.rows_affected;

            match merged {
                None => {
                    Self::validate_rows(shard, &shard_rows)?;
                    merged = Some(shard_rows);
                }
                Some(ref mut merged) => {
                    Self::validate(shard, merged, &shard_rows)?;
                    if merged.columns.is_empty() {
                        merged.columns = shard_rows.columns;
                    }
                    merged.rows.extend(shard_rows.rows);
                }
            }
        }

        let mut merged = merged.unwrap_or_default();
        merged.rows_affected = self.counters.rows_affected;

        debug!(
            "merged {} rows from {} shards [{}]",
            self.counters.rows,
            self.route.shards().len(),
            self.route
        );

        Ok(merged)
    }

    /// Check that the shard returned the same columns as the shards before it.
    ///
    /// Shards that returned no columns (e.g. a write) are skipped.
    fn validate(shard: usize, first: &Rows, rows: &Rows) -> Result<(), Error> {
        Self::validate_rows(shard, rows)?;

        if first.columns.is_empty() || rows.columns.is_empty() {
            return Ok(());
        }

        if first.width() != rows.width() {
            return Err(Error::InconsistentColumns {
                shard,
                expected: first.width(),
                actual: rows.width(),
            });
        }

        for (column, (expected, actual)) in first.columns.iter().zip(rows.columns.iter()).enumerate() {
            if !expected.eq_ignore_ascii_case(actual) {
                return Err(Error::InconsistentColumnNames {
                    shard,
                    column,
                    expected: expected.clone(),
                    actual: actual.clone(),
                });
            }
        }

        Ok(())
    }

    fn validate_rows(shard: usize, rows: &Rows) -> Result<(), Error> {
        if rows.columns.is_empty() {
            return Ok(());
        }

        match rows.rows.iter().find(|row| row.len() != rows.width()) {
            Some(row) => Err(Error::InconsistentDataRow {
                shard,
                expected: rows.width(),
                actual: row.len(),
            }),
            None => Ok(()),
        }
    }
}
