use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::info;

use switchboard_core::audit::{AuditSink, NoopAuditSink};
use switchboard_core::config::AppConfig;
use switchboard_core::domain::agent::{Agent, AgentId};
use switchboard_core::domain::conversation::{ConversationContext, TurnContext};
use switchboard_core::domain::handoff::{HandoffId, HandoffOptions};
use switchboard_core::domain::intent::Intent;
use switchboard_core::domain::response::Response;
use switchboard_core::domain::routing::RoutingDecision;
use switchboard_core::handoff::{HandoffProtocol, HandoffStore};
use switchboard_core::orchestration::{AgentExecutor, Orchestrator};
use switchboard_core::registry::CapabilityRegistry;
use switchboard_core::routing::Router;

use crate::catalog::register_builtin;
use crate::executor::AcknowledgingExecutor;

pub struct AgentRuntime {
    registry: Arc<CapabilityRegistry>,
    orchestrator: Arc<Orchestrator>,
    router: Router,
}

impl AgentRuntime {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn HandoffStore>,
        executor: Arc<dyn AgentExecutor>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let registry = Arc::new(CapabilityRegistry::new());
        let handoff = Arc::new(
            HandoffProtocol::new(store, &config.handoff).with_audit_sink(Arc::clone(&audit)),
        );
        let orchestrator = Arc::new(
            Orchestrator::new(executor, handoff, config.orchestration.clone())
                .with_audit_sink(audit),
        );
        let router =
            Router::new(Arc::clone(&registry), Arc::clone(&orchestrator), config.routing.clone());

        Self { registry, orchestrator, router }
    }

    /// Runtime with the built-in catalog and the acknowledging executor.
    pub fn with_builtin_agents(config: &AppConfig, store: Arc<dyn HandoffStore>) -> Self {
        let runtime =
            Self::new(config, store, Arc::new(AcknowledgingExecutor), Arc::new(NoopAuditSink));
        let registered = register_builtin(&runtime.registry);
        info!(event_name = "runtime.catalog_loaded", registered, "built-in agents registered");
        runtime
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn handoff_protocol(&self) -> &Arc<HandoffProtocol> {
        self.orchestrator.handoff_protocol()
    }

    pub async fn handle_turn(
        &self,
        message: &str,
        intent: &Intent,
        context: &TurnContext,
    ) -> Response {
        self.router.route(message, intent, context).await
    }

    /// Like `handle_turn`, but also returns the decision the response came from.
    pub async fn handle_turn_with_decision(
        &self,
        message: &str,
        intent: &Intent,
        context: &TurnContext,
    ) -> (RoutingDecision, Response) {
        let decision = self.router.decide(intent, context);
        let response = self.router.dispatch(&decision, message, intent, context).await;
        (decision, response)
    }

    /// Hands the conversation from one registered agent to another.
    pub async fn transfer(
        &self,
        from: &AgentId,
        to: &AgentId,
        context: ConversationContext,
        reason: &str,
        options: HandoffOptions,
    ) -> Result<Response> {
        let from_agent = self.lookup(from)?;
        let to_agent = self.lookup(to)?;
        Ok(self.orchestrator.handoff(&from_agent, &to_agent, context, reason, options).await)
    }

    pub async fn accept(&self, handoff_id: &HandoffId, agent_id: &AgentId) -> Result<Response> {
        self.lookup(agent_id)?;
        Ok(self.handoff_protocol().accept_handoff(handoff_id, agent_id).await)
    }

    fn lookup(&self, id: &AgentId) -> Result<Arc<Agent>> {
        self.registry.get(id).ok_or_else(|| anyhow!("unknown agent `{id}`"))
    }
}
