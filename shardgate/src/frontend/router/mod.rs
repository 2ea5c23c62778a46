//! Query router.
//!
//! Decides which shard(s) a statement should go to.

pub mod error;
pub mod fingerprint;
pub mod route;
pub mod schema;

pub use error::Error;
pub use fingerprint::{CanonicalShape, Fingerprint, Normalizer};
pub use route::Route;
pub use schema::SchemaRouter;

use super::Session;
use crate::backend::BindVariables;

/// Resolves a statement to the shards it needs.
pub trait ShardResolver: Send + Sync {
    /// Return the shards `sql` should execute on, in order,
    /// and the plan describing the statement's structure.
    fn resolve(&self, session: &Session, sql: &str, binds: &BindVariables)
        -> Result<Route, Error>;
}
