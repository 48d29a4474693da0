use serde_json::{json, Value};
use switchboard_agent::register_builtin;
use switchboard_core::registry::CapabilityRegistry;

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let registry = CapabilityRegistry::new();
    register_builtin(&registry);

    let agents: Vec<Value> = registry
        .list_all()
        .iter()
        .map(|agent| {
            let metadata = &agent.metadata;
            json!({
                "id": metadata.id,
                "name": metadata.name,
                "type": metadata.agent_type,
                "status": metadata.status.as_str(),
                "priority": metadata.priority,
                "intents": metadata.intents,
                "capabilities": metadata.capabilities,
                "description": metadata.description,
            })
        })
        .collect();

    let stats = registry.stats();
    CommandResult::success_with_data(
        "agents",
        format!(
            "{} agents registered ({} active, {} coming soon)",
            stats.total, stats.active, stats.coming_soon
        ),
        Some(json!({ "agents": agents, "stats": stats })),
    )
}
