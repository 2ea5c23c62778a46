//! Backend shards, as seen by the gateway.

pub mod error;
pub mod rows;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use error::Error;
pub use rows::{BindVariables, Row, Rows, Value};

/// Executes statements on individual shards.
///
/// Connection pooling, retries and topology live behind this trait.
#[async_trait]
pub trait ShardExecutor: Send + Sync {
    /// Execute `sql` on `shard`.
    ///
    /// `token` is canceled when the caller stops waiting for the result.
    /// Honoring it is up to the implementation.
    async fn execute(
        &self,
        token: &CancellationToken,
        shard: usize,
        sql: &str,
        binds: &BindVariables,
    ) -> Result<Rows, Error>;
}
