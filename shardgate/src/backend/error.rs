//! Backend errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("shard {shard}: {message}")]
    Shard { shard: usize, message: String },

    #[error("shard {0} doesn't exist")]
    ShardNotFound(usize),

    #[error("shard {0} is unavailable")]
    Unavailable(usize),

    #[error("canceled")]
    Canceled,
}

impl Error {
    /// Error reported by the database running on a shard.
    pub fn shard(shard: usize, message: impl ToString) -> Self {
        Self::Shard {
            shard,
            message: message.to_string(),
        }
    }
}
