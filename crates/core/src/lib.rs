pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod handoff;
pub mod orchestration;
pub mod registry;
pub mod routing;

pub use audit::{AuditEvent, AuditSink, InMemoryAuditSink, NoopAuditSink};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use domain::agent::{Agent, AgentId, AgentKind, AgentMetadata, AgentStatus};
pub use domain::conversation::{
    ConversationContext, ConversationMessage, CustomerContext, TurnContext,
};
pub use domain::handoff::{HandoffId, HandoffOptions, HandoffRequest, HandoffResult, Urgency};
pub use domain::intent::Intent;
pub use domain::orchestration::{ExecutionStrategy, OrchestrationPlan, OrchestrationResult};
pub use domain::response::{Response, ResponseOutcome};
pub use domain::routing::{RoutingDecision, RoutingStrategy};
pub use errors::{
    HandoffValidationError, PersistenceError, PlanValidationError, StepExecutionError,
};
pub use handoff::{HandoffProtocol, HandoffStore, InMemoryHandoffStore};
pub use orchestration::{AgentExecutor, Orchestrator, StepTask};
pub use registry::{CapabilityRegistry, RegistryStats};
pub use routing::Router;
