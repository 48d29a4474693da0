use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::agent::{Agent, AgentId};
use crate::domain::conversation::{ConversationContext, CustomerContext};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandoffId(pub String);

impl fmt::Display for HandoffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandoffRequest {
    pub from_agent_id: AgentId,
    pub from_agent_name: String,
    pub to_agent_id: AgentId,
    pub to_agent_name: String,
    pub reason: String,
    pub conversation_context: ConversationContext,
    pub customer_context: Option<CustomerContext>,
    pub urgency: Urgency,
    pub metadata: BTreeMap<String, Value>,
}

/// Optional parts of a handoff request. Urgency falls back to normal.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HandoffOptions {
    pub customer_context: Option<CustomerContext>,
    pub urgency: Option<Urgency>,
    pub metadata: BTreeMap<String, Value>,
}

impl HandoffOptions {
    pub fn urgent(urgency: Urgency) -> Self {
        Self { urgency: Some(urgency), ..Self::default() }
    }

    pub fn with_customer(mut self, customer: CustomerContext) -> Self {
        self.customer_context = Some(customer);
        self
    }
}

impl HandoffRequest {
    pub fn new(
        from_agent_id: impl Into<String>,
        from_agent_name: impl Into<String>,
        to_agent_id: impl Into<String>,
        to_agent_name: impl Into<String>,
        reason: impl Into<String>,
        conversation_context: ConversationContext,
    ) -> Self {
        Self {
            from_agent_id: AgentId(from_agent_id.into()),
            from_agent_name: from_agent_name.into(),
            to_agent_id: AgentId(to_agent_id.into()),
            to_agent_name: to_agent_name.into(),
            reason: reason.into(),
            conversation_context,
            customer_context: None,
            urgency: Urgency::Normal,
            metadata: BTreeMap::new(),
        }
    }

    pub fn between(
        from: &Agent,
        to: &Agent,
        reason: impl Into<String>,
        conversation_context: ConversationContext,
    ) -> Self {
        Self::new(
            from.id().0.clone(),
            from.name(),
            to.id().0.clone(),
            to.name(),
            reason,
            conversation_context,
        )
    }

    pub fn with_options(mut self, options: HandoffOptions) -> Self {
        self.customer_context = options.customer_context;
        self.urgency = options.urgency.unwrap_or_default();
        self.metadata = options.metadata;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.conversation_context.session_id
    }
}

/// Pipeline steps a handoff passes through before it succeeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffStage {
    Validation,
    ContextPreparation,
    Persistence,
    MessageGeneration,
}

impl HandoffStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::ContextPreparation => "context_preparation",
            Self::Persistence => "persistence",
            Self::MessageGeneration => "message_generation",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandoffResult {
    pub success: bool,
    pub handoff_id: Option<HandoffId>,
    pub to_agent_id: AgentId,
    pub to_agent_name: String,
    pub message: String,
    pub context: ConversationContext,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
    /// Step that stopped the handoff; `None` on success.
    pub failed_stage: Option<HandoffStage>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffStatus {
    Pending,
    Accepted,
}

impl HandoffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            _ => None,
        }
    }
}

/// Stored form of a handoff. Context, customer and metadata travel as JSON
/// blobs so the store never needs to understand them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandoffRecord {
    pub handoff_id: HandoffId,
    pub session_id: String,
    pub from_agent_id: AgentId,
    pub from_agent_name: String,
    pub to_agent_id: AgentId,
    pub to_agent_name: String,
    pub reason: String,
    pub urgency: Urgency,
    pub context_json: String,
    pub customer_json: Option<String>,
    pub metadata_json: String,
    pub status: HandoffStatus,
    pub accepted_by: Option<AgentId>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl HandoffRecord {
    pub fn from_request(
        handoff_id: HandoffId,
        request: &HandoffRequest,
        created_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            handoff_id,
            session_id: request.conversation_context.session_id.clone(),
            from_agent_id: request.from_agent_id.clone(),
            from_agent_name: request.from_agent_name.clone(),
            to_agent_id: request.to_agent_id.clone(),
            to_agent_name: request.to_agent_name.clone(),
            reason: request.reason.clone(),
            urgency: request.urgency,
            context_json: serde_json::to_string(&request.conversation_context)?,
            customer_json: request
                .customer_context
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            metadata_json: serde_json::to_string(&request.metadata)?,
            status: HandoffStatus::Pending,
            accepted_by: None,
            accepted_at: None,
            created_at,
        })
    }

    pub fn to_request(&self) -> Result<HandoffRequest, serde_json::Error> {
        Ok(HandoffRequest {
            from_agent_id: self.from_agent_id.clone(),
            from_agent_name: self.from_agent_name.clone(),
            to_agent_id: self.to_agent_id.clone(),
            to_agent_name: self.to_agent_name.clone(),
            reason: self.reason.clone(),
            conversation_context: serde_json::from_str(&self.context_json)?,
            customer_context: self.customer_json.as_deref().map(serde_json::from_str).transpose()?,
            urgency: self.urgency,
            metadata: serde_json::from_str(&self.metadata_json)?,
        })
    }
}
