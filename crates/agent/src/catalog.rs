use switchboard_core::domain::agent::{Agent, AgentMetadata, AgentStatus};
use switchboard_core::registry::CapabilityRegistry;

pub const CUSTOMER_SERVICE_AGENT: &str = "customer-service-agent";
pub const SALES_AGENT: &str = "sales-agent";
pub const ARTWORK_AGENT: &str = "mccarthy-artwork-agent";
pub const PRODUCTION_AGENT: &str = "production-agent";
pub const SHIPPING_AGENT: &str = "shipping-agent";

pub fn builtin_agents() -> Vec<Agent> {
    vec![
        Agent::intent_matcher(
            AgentMetadata::new(CUSTOMER_SERVICE_AGENT, "customer-service", "Customer Service Agent")
                .with_description("Order support, refunds and general questions")
                .with_version("1.0.0")
                .with_priority(10)
                .with_intents([
                    "support",
                    "refund",
                    "order-status",
                    "complaint",
                    "complex-analysis",
                ])
                .with_capabilities(["order-lookup", "refunds", "conversation"]),
        ),
        Agent::intent_matcher(
            AgentMetadata::new(SALES_AGENT, "sales", "Sales Agent")
                .with_description("Pricing, quotes and product recommendations")
                .with_version("1.0.0")
                .with_priority(20)
                .with_intents(["pricing", "quote", "product-inquiry", "complex-analysis"])
                .with_capabilities(["pricing", "quotes", "product-recommendations"])
                .with_constraint("never commits to discounts without approval"),
        ),
        Agent::domain_specialist(
            AgentMetadata::new(ARTWORK_AGENT, "artwork", "McCarthy Artwork Analyzer")
                .with_description("Artwork analysis, DPI calculations and print preparation")
                .with_version("1.0.0")
                .with_priority(30)
                .with_intents(["artwork-analysis", "calculation", "howto", "information"])
                .with_capabilities(["calculations", "artwork-analysis", "dpi"]),
            ["printing", "artwork"],
        ),
        Agent::intent_matcher(
            AgentMetadata::new(PRODUCTION_AGENT, "production", "Production Agent")
                .with_description("Production status and timelines")
                .with_status(AgentStatus::ComingSoon)
                .with_intents(["production-status"]),
        ),
        Agent::intent_matcher(
            AgentMetadata::new(SHIPPING_AGENT, "shipping", "Shipping Agent")
                .with_description("Shipping and delivery tracking")
                .with_status(AgentStatus::ComingSoon)
                .with_intents(["shipping", "tracking"]),
        ),
    ]
}

pub fn register_builtin(registry: &CapabilityRegistry) -> usize {
    let agents = builtin_agents();
    let count = agents.len();
    for agent in agents {
        registry.register(agent);
    }
    count
}
