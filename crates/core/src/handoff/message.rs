use std::collections::BTreeMap;

use crate::domain::agent::AgentId;
use crate::domain::conversation::{ConversationContext, CustomerContext};
use crate::domain::handoff::Urgency;

pub const ACCEPT_MESSAGE: &str =
    "Thanks for the handoff! I've got all the context and I'm ready to help.";

const FALLBACK_SPECIALTY: &str = "this area";

const BUILTIN_SPECIALTIES: &[(&str, &str)] = &[
    ("sales-agent", "pricing, quotes, and product recommendations"),
    ("customer-service-agent", "customer support and order assistance"),
    ("mccarthy-artwork-agent", "artwork analysis and print preparation"),
    ("production-agent", "production status and timelines"),
    ("shipping-agent", "shipping and delivery"),
];

/// Maps receiving agent ids to the phrase used in the connecting message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpecialtyTable {
    entries: BTreeMap<String, String>,
}

impl Default for SpecialtyTable {
    fn default() -> Self {
        Self {
            entries: BUILTIN_SPECIALTIES
                .iter()
                .map(|(agent_id, specialty)| ((*agent_id).to_owned(), (*specialty).to_owned()))
                .collect(),
        }
    }
}

impl SpecialtyTable {
    /// Built-in table with `overrides` layered on top.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut table = Self::default();
        table
            .entries
            .extend(overrides.iter().map(|(id, specialty)| (id.clone(), specialty.clone())));
        table
    }

    pub fn specialty_for(&self, agent_id: &AgentId) -> &str {
        self.entries.get(agent_id.as_str()).map(String::as_str).unwrap_or(FALLBACK_SPECIALTY)
    }
}

pub fn connecting_message(
    to_agent_name: &str,
    specialty: &str,
    urgency: Urgency,
    customer: Option<&CustomerContext>,
) -> String {
    let prefix = if urgency.is_elevated() { "⚡ " } else { "" };
    let mut message = format!(
        "{prefix}I'm connecting you with {to_agent_name}, who specializes in {specialty}. \
         They'll have full context of our conversation and can help you right away."
    );

    if customer.map(|customer| customer.is_vip).unwrap_or(false) {
        message.push_str("\n\n✨ As a VIP customer, you'll receive priority assistance.");
    }

    message
}

pub fn failure_message(to_agent_name: &str) -> String {
    format!("I'm having trouble connecting you with {to_agent_name}. Let me try again.")
}

/// One-line recap for the receiving agent, built from user turns only.
/// Returns `None` when no message came from the user.
pub fn synthesize_summary(context: &ConversationContext) -> Option<String> {
    let user_messages: Vec<&str> =
        context.user_messages().map(|message| message.content.as_str()).collect();

    match user_messages.as_slice() {
        [] => None,
        [only] => Some(format!("Customer asked: \"{only}\"")),
        [.., last] => Some(format!(
            "Customer has been discussing: {last}. {} messages exchanged.",
            user_messages.len()
        )),
    }
}
