pub mod engine;
pub mod executor;
pub mod plan;

pub use engine::Orchestrator;
pub use executor::{AgentExecutor, StepTask};
pub use plan::{build_plan, dependency_levels};
