use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::agent::AgentId;
use crate::domain::conversation::ConversationContext;
use crate::domain::handoff::HandoffId;
use crate::domain::orchestration::OrchestrationSummary;
use crate::domain::routing::RoutingStrategy;

/// What produced a response. Known flags are typed; anything else goes in
/// `ResponseMetadata::extra`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResponseOutcome {
    Routed {
        strategy: RoutingStrategy,
        agent_id: Option<AgentId>,
        agent_name: Option<String>,
    },
    Orchestration(OrchestrationSummary),
    HandoffInitiated {
        handoff_id: HandoffId,
        from_agent_id: AgentId,
        to_agent_id: AgentId,
        to_agent_name: String,
        context: ConversationContext,
        timestamp: DateTime<Utc>,
    },
    HandoffFailed {
        from_agent_id: AgentId,
        to_agent_id: AgentId,
        error: String,
    },
    HandoffAccepted {
        handoff_id: HandoffId,
        accepted_by: AgentId,
        timestamp: DateTime<Utc>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub handler_name: String,
    pub timestamp: DateTime<Utc>,
    pub outcome: Option<ResponseOutcome>,
    #[serde(default)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub content: String,
    pub metadata: ResponseMetadata,
}

impl Response {
    pub fn new(content: impl Into<String>, handler_name: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: ResponseMetadata {
                handler_name: handler_name.into(),
                timestamp: Utc::now(),
                outcome: None,
                extra: BTreeMap::new(),
            },
        }
    }

    pub fn with_outcome(mut self, outcome: ResponseOutcome) -> Self {
        self.metadata.outcome = Some(outcome);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.extra.insert(key.into(), value);
        self
    }

    pub fn outcome(&self) -> Option<&ResponseOutcome> {
        self.metadata.outcome.as_ref()
    }

    pub fn routing_strategy(&self) -> Option<RoutingStrategy> {
        match self.outcome()? {
            ResponseOutcome::Routed { strategy, .. } => Some(*strategy),
            ResponseOutcome::Orchestration(_) => Some(RoutingStrategy::MultiAgent),
            _ => None,
        }
    }

    pub fn orchestration(&self) -> Option<&OrchestrationSummary> {
        match self.outcome()? {
            ResponseOutcome::Orchestration(summary) => Some(summary),
            _ => None,
        }
    }

    pub fn orchestration_success(&self) -> bool {
        self.orchestration().map(|summary| summary.success).unwrap_or(false)
    }

    pub fn orchestration_failed(&self) -> bool {
        self.orchestration().map(|summary| !summary.success).unwrap_or(false)
    }

    pub fn is_handoff(&self) -> bool {
        matches!(self.outcome(), Some(ResponseOutcome::HandoffInitiated { .. }))
    }

    pub fn handoff_failed(&self) -> bool {
        matches!(self.outcome(), Some(ResponseOutcome::HandoffFailed { .. }))
    }

    pub fn error(&self) -> Option<&str> {
        match self.outcome()? {
            ResponseOutcome::HandoffFailed { error, .. } => Some(error),
            ResponseOutcome::Orchestration(summary) => summary.error.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Response, ResponseOutcome};
    use crate::domain::agent::AgentId;
    use crate::domain::orchestration::{ExecutionStrategy, OrchestrationSummary};
    use crate::domain::routing::RoutingStrategy;

    #[test]
    fn flags_follow_outcome_variant() {
        let failed = Response::new("sorry", "AgentOrchestrator").with_outcome(
            ResponseOutcome::Orchestration(OrchestrationSummary {
                success: false,
                strategy: ExecutionStrategy::Sequential,
                agents_involved: vec!["A".to_owned()],
                steps_completed: 0,
                total_steps: 1,
                elapsed_ms: 3,
                error: None,
            }),
        );

        assert!(failed.orchestration_failed());
        assert!(!failed.orchestration_success());
        assert_eq!(failed.routing_strategy(), Some(RoutingStrategy::MultiAgent));
        assert!(!failed.handoff_failed());
    }

    #[test]
    fn serializes_outcome_tag_alongside_extra_fields() {
        let response = Response::new("", "AgentRouter")
            .with_outcome(ResponseOutcome::Routed {
                strategy: RoutingStrategy::Foundation,
                agent_id: None,
                agent_name: None,
            })
            .with_extra("traceHint", json!("abc"));

        let value = serde_json::to_value(&response).expect("serialize response");
        assert_eq!(value["metadata"]["outcome"]["outcome"], json!("routed"));
        assert_eq!(value["metadata"]["outcome"]["strategy"], json!("foundation"));
        assert_eq!(value["metadata"]["extra"]["traceHint"], json!("abc"));
    }

    #[test]
    fn handoff_failure_exposes_error() {
        let response = Response::new("trouble", "AgentOrchestrator").with_outcome(
            ResponseOutcome::HandoffFailed {
                from_agent_id: AgentId::from("a"),
                to_agent_id: AgentId::from("a"),
                error: "Cannot handoff to the same agent".to_owned(),
            },
        );

        assert!(response.handoff_failed());
        assert_eq!(response.error(), Some("Cannot handoff to the same agent"));
    }
}
