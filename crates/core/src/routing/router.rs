//! Entry point for a turn: picks a routing strategy and dispatches it.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::RoutingConfig;
use crate::domain::agent::Agent;
use crate::domain::conversation::TurnContext;
use crate::domain::intent::Intent;
use crate::domain::response::{Response, ResponseOutcome};
use crate::domain::routing::{RoutingDecision, RoutingStrategy};
use crate::orchestration::Orchestrator;
use crate::registry::CapabilityRegistry;

const HANDLER_NAME: &str = "AgentRouter";

const NO_AGENT_REASON: &str = "No specialized agents available for this intent";
const COLLABORATION_REASON: &str =
    "This request requires multiple specialized agents working together";

pub struct Router {
    registry: Arc<CapabilityRegistry>,
    orchestrator: Arc<Orchestrator>,
    config: RoutingConfig,
}

impl Router {
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        orchestrator: Arc<Orchestrator>,
        config: RoutingConfig,
    ) -> Self {
        Self { registry, orchestrator, config }
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub fn is_collaborative(&self, intent: &Intent) -> bool {
        self.config.collaborative_intents.contains(&intent.intent_type)
    }

    /// Pure function of the registry snapshot and the intent.
    pub fn decide(&self, intent: &Intent, context: &TurnContext) -> RoutingDecision {
        let mut capable = self.registry.find_capable(intent);

        let decision = match capable.len() {
            0 => self.fallback_decision(intent),
            1 => {
                let agent = capable.remove(0);
                RoutingDecision {
                    strategy: RoutingStrategy::SingleAgent,
                    reason: format!("{} is the specialist for this request", agent.name()),
                    agents: vec![agent],
                    confidence: 0.9,
                }
            }
            _ if self.is_collaborative(intent) => RoutingDecision {
                strategy: RoutingStrategy::MultiAgent,
                agents: capable,
                reason: COLLABORATION_REASON.to_owned(),
                confidence: 0.85,
            },
            _ => {
                capable.truncate(1);
                let reason = format!("{} is the best match for this request", capable[0].name());
                RoutingDecision {
                    strategy: RoutingStrategy::SingleAgent,
                    agents: capable,
                    reason,
                    confidence: 0.9,
                }
            }
        };

        info!(
            event_name = "routing.decision",
            correlation_id = %context.correlation_id,
            intent_type = %intent.intent_type,
            strategy = decision.strategy.as_str(),
            agents = ?decision.agent_ids(),
            confidence = decision.confidence,
            "routing decision made"
        );
        decision
    }

    fn fallback_decision(&self, intent: &Intent) -> RoutingDecision {
        if self.config.announce_coming_soon {
            if let Some(agent) = self.registry.find_upcoming(intent).into_iter().next() {
                return RoutingDecision {
                    strategy: RoutingStrategy::ComingSoon,
                    reason: format!("{} is coming soon", agent.name()),
                    agents: vec![agent],
                    confidence: 0.8,
                };
            }
        }
        RoutingDecision::foundation(NO_AGENT_REASON)
    }

    pub async fn route(&self, message: &str, intent: &Intent, context: &TurnContext) -> Response {
        let decision = self.decide(intent, context);
        self.dispatch(&decision, message, intent, context).await
    }

    /// Carries out a decision that was already made for this turn.
    pub async fn dispatch(
        &self,
        decision: &RoutingDecision,
        message: &str,
        intent: &Intent,
        context: &TurnContext,
    ) -> Response {
        match (decision.strategy, decision.primary_agent()) {
            (RoutingStrategy::MultiAgent, Some(_)) => {
                self.orchestrator.orchestrate(message, intent, context, &decision.agents).await
            }
            (RoutingStrategy::SingleAgent, Some(agent)) => Response::new(
                format!("I'll connect you with {} to help with that.", agent.name()),
                HANDLER_NAME,
            )
            .with_outcome(routed(RoutingStrategy::SingleAgent, Some(agent))),
            (RoutingStrategy::ComingSoon, Some(agent)) => Response::new(
                coming_soon_message(agent),
                HANDLER_NAME,
            )
            .with_outcome(routed(RoutingStrategy::ComingSoon, Some(agent))),
            (strategy, _) => {
                if strategy != RoutingStrategy::Foundation {
                    debug!(
                        event_name = "routing.foundation_fallback",
                        correlation_id = %context.correlation_id,
                        strategy = strategy.as_str(),
                        "decision had no agent, falling back to foundation"
                    );
                }
                Response::new(String::new(), HANDLER_NAME)
                    .with_outcome(routed(RoutingStrategy::Foundation, None))
            }
        }
    }
}

fn routed(strategy: RoutingStrategy, agent: Option<&Arc<Agent>>) -> ResponseOutcome {
    ResponseOutcome::Routed {
        strategy,
        agent_id: agent.map(|agent| agent.id().clone()),
        agent_name: agent.map(|agent| agent.name().to_owned()),
    }
}

fn coming_soon_message(agent: &Agent) -> String {
    format!(
        "I'd love to help with that! {} is coming soon and will be able to assist you with {}. \
         In the meantime, is there anything else I can help you with?",
        agent.name(),
        agent.metadata.description.to_lowercase()
    )
}
