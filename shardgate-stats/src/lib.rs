pub mod plan;
pub mod scatter;

pub use plan::*;
pub use scatter::*;
