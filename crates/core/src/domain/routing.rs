use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::agent::Agent;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingStrategy {
    Foundation,
    SingleAgent,
    MultiAgent,
    ComingSoon,
}

impl RoutingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Foundation => "foundation",
            Self::SingleAgent => "single-agent",
            Self::MultiAgent => "multi-agent",
            Self::ComingSoon => "coming-soon",
        }
    }
}

/// Outcome of `Router::decide`. `agents` is empty only for foundation.
#[derive(Clone, Debug)]
pub struct RoutingDecision {
    pub strategy: RoutingStrategy,
    pub agents: Vec<Arc<Agent>>,
    pub reason: String,
    pub confidence: f64,
}

impl RoutingDecision {
    pub fn foundation(reason: impl Into<String>) -> Self {
        Self {
            strategy: RoutingStrategy::Foundation,
            agents: Vec::new(),
            reason: reason.into(),
            confidence: 1.0,
        }
    }

    pub fn primary_agent(&self) -> Option<&Arc<Agent>> {
        self.agents.first()
    }

    pub fn agent_ids(&self) -> Vec<&str> {
        self.agents.iter().map(|agent| agent.id().as_str()).collect()
    }
}
