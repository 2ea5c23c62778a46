//! Query routing and scatter-gather execution for sharded SQL backends.
//!
//! A statement is resolved to one or more shards, executed on each of them
//! and merged. Statements that need more than one shard are recorded in the
//! scatter statistics, which can be rendered as a text report or OpenMetrics.

pub mod backend;
pub mod frontend;
pub mod logger;
pub mod stats;

#[cfg(test)]
pub mod test;

pub use backend::{BindVariables, Rows, ShardExecutor, Value};
pub use frontend::{
    router::{CanonicalShape, Fingerprint, Normalizer, Route, SchemaRouter, ShardResolver},
    Error, Executor, Session,
};
pub use shardgate_config as config;
pub use stats::ScatterStats;
