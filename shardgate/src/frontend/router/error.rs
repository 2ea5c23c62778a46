//! Routing errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("empty query")]
    EmptyQuery,

    #[error("session has no target")]
    EmptyTarget,

    #[error("invalid target \"{0}\"")]
    Target(String),

    #[error("shard {shard} is out of range, only {shards} shard(s) configured")]
    ShardOutOfRange { shard: usize, shards: usize },

    #[error("bind variable \"{0}\" is missing")]
    MissingBind(String),
}
