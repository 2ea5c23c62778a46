// Submodules
pub mod core;
pub mod error;
pub mod general;
pub mod sharding;

pub use core::Config;
pub use error::Error;
pub use general::{General, LogFormat};
pub use sharding::ShardedTable;
