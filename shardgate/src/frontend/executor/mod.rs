//! Execution coordinator.
//!
//! Resolves a statement to its shards, executes it on each of them
//! and records scatter executions in the scatter statistics.

pub mod multi_shard;
pub mod stats;

use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use shardgate_config::{Config, General};
use shardgate_stats::{PlanKind, ScatterStatsSnapshot};
use tokio::select;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::router::{Error as RouterError, Fingerprint, Normalizer, Route, SchemaRouter, ShardResolver};
use super::{Error, Session};
use crate::backend::{BindVariables, Rows, ShardExecutor};
use crate::stats::{report, ScatterEntry, ScatterStats};

pub use multi_shard::{MultiShard, ShardResult};
pub use stats::Counters;

/// Executes statements against one or more shards.
pub struct Executor {
    resolver: Arc<dyn ShardResolver>,
    fingerprint: Arc<dyn Fingerprint>,
    backend: Arc<dyn ShardExecutor>,
    scatter_stats: ScatterStats,
    counters: Counters,
    record_scatter: bool,
    timeout: Option<Duration>,
    default_target: Option<String>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("counters", &self.counters)
            .field("record_scatter", &self.record_scatter)
            .field("timeout", &self.timeout)
            .field("default_target", &self.default_target)
            .finish()
    }
}

impl Executor {
    /// Create executor with default settings and its own scatter statistics.
    pub fn new(resolver: Arc<dyn ShardResolver>, backend: Arc<dyn ShardExecutor>) -> Self {
        Self {
            resolver,
            fingerprint: Arc::new(Normalizer::new()),
            backend,
            scatter_stats: ScatterStats::new(),
            counters: Counters::default(),
            record_scatter: true,
            timeout: None,
            default_target: None,
        }
    }

    /// Create executor routing with the configured sharded tables.
    pub fn from_config(config: Arc<Config>, backend: Arc<dyn ShardExecutor>) -> Self {
        let general = config.general.clone();
        Self::new(Arc::new(SchemaRouter::new(config)), backend).with_general(&general)
    }

    /// Apply general settings.
    pub fn with_general(mut self, general: &General) -> Self {
        self.record_scatter = general.scatter_stats;
        self.timeout = general.query_timeout();
        self.default_target = Some(general.default_target.clone())
            .filter(|target| !target.trim().is_empty());
        self
    }

    /// Use a different fingerprint for statistics keys.
    pub fn with_fingerprint(mut self, fingerprint: Arc<dyn Fingerprint>) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    /// Record into existing scatter statistics, e.g. shared between executors.
    pub fn with_scatter_stats(mut self, scatter_stats: ScatterStats) -> Self {
        self.scatter_stats = scatter_stats;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Scatter statistics this executor records into.
    pub fn scatter_stats(&self) -> &ScatterStats {
        &self.scatter_stats
    }

    /// Execute a statement.
    ///
    /// Canceling `token` stops waiting on the shards and returns [`Error::Canceled`].
    /// A session without a target uses the configured default target.
    pub async fn execute(
        &self,
        token: &CancellationToken,
        session: &Session,
        sql: &str,
        binds: &BindVariables,
    ) -> Result<Rows, Error> {
        let with_default;
        let session = if session.target().trim().is_empty() {
            let Some(target) = self.default_target.as_deref() else {
                return Err(RouterError::EmptyTarget.into());
            };
            let mut session = session.clone();
            session.set_target(target);
            with_default = session;
            &with_default
        } else {
            session
        };

        if sql.trim().is_empty() {
            return Err(RouterError::EmptyQuery.into());
        }

        let route = self.resolver.resolve(session, sql, binds)?;

        if route.is_empty() {
            return Err(Error::NoRoute);
        }

        debug!("{} [{}]", sql, route);

        self.counters.add(route.kind());

        match route.kind() {
            PlanKind::Single => self.direct(token, &route, sql, binds).await,
            PlanKind::Scatter => {
                let entry = self.record(sql, &route);
                let started = Instant::now();
                let result = self.scatter(token, &route, sql, binds).await;

                if let Some(entry) = entry {
                    entry.finish(started.elapsed(), result.is_ok());
                }

                result
            }
        }
    }

    /// Send the statement to a single shard. The result isn't touched.
    async fn direct(
        &self,
        token: &CancellationToken,
        route: &Route,
        sql: &str,
        binds: &BindVariables,
    ) -> Result<Rows, Error> {
        let shard = route.shards()[0];
        let child = token.child_token();
        let result = self
            .wait(token, &child, self.backend.execute(&child, shard, sql, binds))
            .await?;

        Ok(result?)
    }

    /// Send the statement to all shards in the route and merge the results.
    async fn scatter(
        &self,
        token: &CancellationToken,
        route: &Route,
        sql: &str,
        binds: &BindVariables,
    ) -> Result<Rows, Error> {
        let multi_shard = MultiShard::new(route);
        let child = token.child_token();
        let results = self
            .wait(
                token,
                &child,
                multi_shard.dispatch(self.backend.as_ref(), &child, sql, binds),
            )
            .await?;

        multi_shard.merge(results)
    }

    /// Wait for shard execution, unless the caller cancels or the timeout expires.
    ///
    /// On either, `child` is canceled so executors can stop their work.
    async fn wait<F, T>(
        &self,
        token: &CancellationToken,
        child: &CancellationToken,
        future: F,
    ) -> Result<T, Error>
    where
        F: Future<Output = T>,
    {
        let guarded = async {
            select! {
                biased;
                _ = token.cancelled() => Err(Error::Canceled),
                output = future => Ok(output),
            }
        };

        let result = match self.timeout {
            Some(duration) => match timeout(duration, guarded).await {
                Ok(result) => result,
                Err(elapsed) => Err(Error::from(elapsed)),
            },
            None => guarded.await,
        };

        if result.is_err() {
            child.cancel();
        }

        result
    }

    /// Record a scatter execution.
    ///
    /// Statistics never fail the query; errors are logged and ignored.
    fn record(&self, sql: &str, route: &Route) -> Option<ScatterEntry> {
        if !self.record_scatter {
            return None;
        }

        let shape = match self.fingerprint.shape(sql) {
            Ok(shape) => shape,
            Err(err) => {
                error!("scatter stats: {} [{}]", err, sql);
                return None;
            }
        };

        match self.scatter_stats.record(&shape, route.plan()) {
            Ok(entry) => Some(entry),
            Err(err) => {
                error!("scatter stats: {} [{}]", err, shape);
                None
            }
        }
    }

    /// Point-in-time copy of the scatter statistics,
    /// including execution totals.
    pub fn gather_stats(&self) -> Result<ScatterStatsSnapshot, crate::stats::Error> {
        self.scatter_stats.snapshot_with(self.counters.load())
    }

    /// Write the scatter statistics report to `sink`.
    pub fn write_scatter_stats(&self, sink: &mut impl Write) -> std::io::Result<()> {
        let snapshot = self
            .gather_stats()
            .map_err(|err| std::io::Error::other(err.to_string()))?;
        report::write(sink, &snapshot)
    }
}
