//! Test helpers.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use shardgate_config::{Config, ShardedTable};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::backend::{BindVariables, Error, Rows, ShardExecutor, Value};
use crate::frontend::Executor;

/// Four shards, `user` sharded on `id`, everything else unsharded.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.general.shards = 4;
    config.general.scatter_stats = true;
    config.general.query_timeout = 0;
    config.general.default_target = "@primary".into();
    config.sharded_tables = vec![ShardedTable::new("user", "id")];
    config
}

/// Executor over [`TestShards`] using [`test_config`].
pub fn test_executor() -> (Executor, Arc<TestShards>) {
    let shards = Arc::new(TestShards::new(4));
    let executor = Executor::from_config(Arc::new(test_config()), shards.clone());
    (executor, shards)
}

/// In-memory shards.
///
/// Every shard returns one row: `(shard, sql)`.
#[derive(Debug, Default)]
pub struct TestShards {
    shards: usize,
    failing: Mutex<HashSet<usize>>,
    delays: Mutex<Vec<(usize, Duration)>>,
    executed: Mutex<Vec<usize>>,
    calls: AtomicUsize,
}

impl TestShards {
    pub fn new(shards: usize) -> Self {
        Self {
            shards,
            ..Default::default()
        }
    }

    /// Make a shard return an error.
    pub fn fail(&self, shard: usize) {
        self.failing.lock().insert(shard);
    }

    /// Make a shard slow.
    pub fn delay(&self, shard: usize, delay: Duration) {
        self.delays.lock().push((shard, delay));
    }

    /// Shards that were sent a statement, in the order it was sent.
    pub fn executed(&self) -> Vec<usize> {
        self.executed.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ShardExecutor for TestShards {
    async fn execute(
        &self,
        token: &CancellationToken,
        shard: usize,
        sql: &str,
        _binds: &BindVariables,
    ) -> Result<Rows, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.executed.lock().push(shard);

        if shard >= self.shards {
            return Err(Error::ShardNotFound(shard));
        }

        let delay = self
            .delays
            .lock()
            .iter()
            .find(|(s, _)| *s == shard)
            .map(|(_, d)| *d);

        if let Some(delay) = delay {
            tokio::select! {
                _ = token.cancelled() => return Err(Error::Canceled),
                _ = sleep(delay) => (),
            }
        }

        if self.failing.lock().contains(&shard) {
            return Err(Error::shard(shard, "connection reset by peer"));
        }

        Ok(Rows::new(&["shard", "sql"]).add(vec![
            Value::Integer(shard as i64),
            Value::Text(sql.to_string()),
        ]))
    }
}
