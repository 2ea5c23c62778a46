//! Client-facing side of the gateway.

pub mod error;
pub mod executor;
pub mod router;
pub mod session;

pub use error::{Error, PartialScatterError, ShardFailure};
pub use executor::Executor;
pub use session::{Session, Target};
