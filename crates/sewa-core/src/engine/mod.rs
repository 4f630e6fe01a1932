pub mod applications;
pub mod builder;
pub mod core;
pub mod prioritization;
pub mod programs;
pub mod selection;
pub mod sweep;

pub use builder::{EngineBuilder, EngineSettings};
pub use self::core::{WorkflowEngine, WorkflowStatus};
pub use selection::SelectionResult;
pub use sweep::SweepReport;
