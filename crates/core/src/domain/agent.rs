use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::intent::Intent;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentStatus {
    Active,
    Inactive,
    ComingSoon,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::ComingSoon => "coming-soon",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "coming-soon" | "coming_soon" => Some(Self::ComingSoon),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentMetadata {
    pub id: AgentId,
    #[serde(rename = "type")]
    pub agent_type: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub capabilities: BTreeSet<String>,
    pub intents: BTreeSet<String>,
    pub status: AgentStatus,
    pub priority: i32,
    pub constraints: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentMetadata {
    /// Starts an active agent at priority 0 with no declared capabilities.
    pub fn new(
        id: impl Into<String>,
        agent_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AgentId(id.into()),
            agent_type: agent_type.into(),
            name: name.into(),
            description: String::new(),
            version: "1.0.0".to_owned(),
            capabilities: BTreeSet::new(),
            intents: BTreeSet::new(),
            status: AgentStatus::Active,
            priority: 0,
            constraints: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities.extend(capabilities.into_iter().map(Into::into));
        self
    }

    pub fn with_intents<I, S>(mut self, intents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.intents.extend(intents.into_iter().map(Into::into));
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == AgentStatus::Active
    }
}

/// Capability predicates every agent answers. Both must be pure.
pub trait CapabilityPredicate {
    /// The agent can own the whole request.
    fn can_handle(&self, intent: &Intent) -> bool;
    /// The agent can supply part of a request owned by someone else.
    fn can_contribute(&self, intent: &Intent) -> bool;
}

/// How an agent decides whether an intent is its business.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentKind {
    /// Handles intents whose type is listed in the metadata. Contributes when
    /// the intent action or a requested capability overlaps its capabilities.
    IntentMatcher,
    /// Handles listed intent types and contributes whenever the intent names
    /// one of its domains.
    DomainSpecialist { domains: BTreeSet<String> },
    /// Handles any intent whose action is in `actions`.
    ActionMatcher { actions: BTreeSet<String> },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub metadata: AgentMetadata,
    pub kind: AgentKind,
}

impl Agent {
    pub fn new(metadata: AgentMetadata, kind: AgentKind) -> Self {
        Self { metadata, kind }
    }

    pub fn intent_matcher(metadata: AgentMetadata) -> Self {
        Self::new(metadata, AgentKind::IntentMatcher)
    }

    pub fn domain_specialist<I, S>(metadata: AgentMetadata, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            metadata,
            AgentKind::DomainSpecialist { domains: domains.into_iter().map(Into::into).collect() },
        )
    }

    pub fn action_matcher<I, S>(metadata: AgentMetadata, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            metadata,
            AgentKind::ActionMatcher { actions: actions.into_iter().map(Into::into).collect() },
        )
    }

    pub fn id(&self) -> &AgentId {
        &self.metadata.id
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn priority(&self) -> i32 {
        self.metadata.priority
    }

    fn handles_intent_type(&self, intent: &Intent) -> bool {
        self.metadata.intents.contains(&intent.intent_type)
    }

    fn shares_capability(&self, intent: &Intent) -> bool {
        self.metadata.capabilities.contains(&intent.action)
            || intent
                .requested_capabilities()
                .iter()
                .any(|capability| self.metadata.capabilities.contains(*capability))
    }
}

impl CapabilityPredicate for Agent {
    fn can_handle(&self, intent: &Intent) -> bool {
        match &self.kind {
            AgentKind::IntentMatcher | AgentKind::DomainSpecialist { .. } => {
                self.handles_intent_type(intent)
            }
            AgentKind::ActionMatcher { actions } => actions.contains(&intent.action),
        }
    }

    fn can_contribute(&self, intent: &Intent) -> bool {
        if self.can_handle(intent) {
            return true;
        }

        match &self.kind {
            AgentKind::IntentMatcher | AgentKind::ActionMatcher { .. } => {
                self.shares_capability(intent)
            }
            AgentKind::DomainSpecialist { domains } => intent
                .entity_str("domain")
                .map(|domain| domains.contains(&domain.to_ascii_lowercase()))
                .unwrap_or(false),
        }
    }
}
