pub mod conflict;
pub mod error;
pub mod lifecycle;
pub mod orchestrator;
pub mod query;
pub mod queue;
pub mod readiness;
pub mod registry;
pub mod types;


pub use error::*;
pub use lifecycle::Operation;
pub use orchestrator::*;
pub use query::*;
pub use readiness::Readiness;
pub use types::*;
