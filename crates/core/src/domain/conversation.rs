use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), timestamp: Utc::now() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), timestamp: Utc::now() }
    }
}

/// Conversation state carried across a handoff.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub session_id: String,
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
    #[serde(default)]
    pub current_intent: Option<String>,
    #[serde(default)]
    pub last_topic: Option<String>,
    #[serde(default)]
    pub extracted_entities: BTreeMap<String, Value>,
    #[serde(default)]
    pub conversation_summary: Option<String>,
}

impl ConversationContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self { session_id: session_id.into(), ..Self::default() }
    }

    pub fn with_message(mut self, message: ConversationMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_current_intent(mut self, intent: impl Into<String>) -> Self {
        self.current_intent = Some(intent.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.conversation_summary = Some(summary.into());
        self
    }

    pub fn user_messages(&self) -> impl Iterator<Item = &ConversationMessage> {
        self.messages.iter().filter(|message| message.role == Role::User)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: String,
    pub date: String,
    pub total: f64,
    pub status: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerContext {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_vip: bool,
    #[serde(default)]
    pub lifetime_value: Option<f64>,
    #[serde(default)]
    pub order_history: Vec<OrderSummary>,
    #[serde(default)]
    pub preferences: BTreeMap<String, Value>,
}

impl CustomerContext {
    pub fn vip() -> Self {
        Self { is_vip: true, ..Self::default() }
    }
}

/// Per-turn request context handed down from the entry layer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnContext {
    pub correlation_id: String,
    pub session_id: Option<String>,
}

impl TurnContext {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self { correlation_id: correlation_id.into(), session_id: None }
    }

    pub fn for_session(correlation_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self { correlation_id: correlation_id.into(), session_id: Some(session_id.into()) }
    }
}
