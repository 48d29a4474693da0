use std::sync::Arc;

use serde_json::json;
use switchboard_agent::AgentRuntime;
use switchboard_core::domain::conversation::TurnContext;
use switchboard_core::domain::intent::Intent;
use switchboard_core::handoff::InMemoryHandoffStore;
use uuid::Uuid;

use crate::commands::{async_runtime, load_config, CommandResult};

/// Dry-runs one turn against the built-in catalog. Handoffs made during the
/// turn stay in memory.
pub fn run(intent_type: &str, action: &str, message: &str) -> CommandResult {
    if intent_type.trim().is_empty() {
        return CommandResult::failure("route", "usage", "--intent must not be empty", 2);
    }

    let config = match load_config("route") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match async_runtime("route") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let agents = AgentRuntime::with_builtin_agents(&config, Arc::new(InMemoryHandoffStore::new()));
    let intent = Intent::new(intent_type.trim(), action);
    let context = TurnContext::new(Uuid::new_v4().to_string());

    let (decision, response) =
        runtime.block_on(agents.handle_turn_with_decision(message, &intent, &context));

    CommandResult::success_with_data(
        "route",
        decision.reason.clone(),
        Some(json!({
            "strategy": decision.strategy.as_str(),
            "agents": decision.agent_ids(),
            "confidence": decision.confidence,
            "response": {
                "content": response.content,
                "handler": response.metadata.handler_name,
                "outcome": response.metadata.outcome,
            },
        })),
    )
}
