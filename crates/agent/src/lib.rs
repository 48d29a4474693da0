//! Agent runtime for the switchboard.
//!
//! Wires the capability registry, router, orchestrator and handoff protocol
//! from `switchboard_core` into one per-process [`AgentRuntime`]:
//! 1. **Catalog** (`catalog`) - the built-in agents registered at startup
//! 2. **Execution** (`executor`) - the default `AgentExecutor` used for plan steps
//! 3. **Runtime** (`runtime`) - turn handling and agent-to-agent transfers
//!
//! Agents never decide routing. The router owns that decision and agents only
//! produce step output.

pub mod catalog;
pub mod executor;
pub mod runtime;

pub use catalog::{builtin_agents, register_builtin};
pub use executor::AcknowledgingExecutor;
pub use runtime::AgentRuntime;
