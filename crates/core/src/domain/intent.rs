use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classified user request as produced by the upstream intent extractor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(rename = "type")]
    pub intent_type: String,
    pub action: String,
    #[serde(default)]
    pub entities: BTreeMap<String, Value>,
}

impl Intent {
    pub fn new(intent_type: impl Into<String>, action: impl Into<String>) -> Self {
        Self { intent_type: intent_type.into(), action: action.into(), entities: BTreeMap::new() }
    }

    pub fn with_entity(mut self, key: impl Into<String>, value: Value) -> Self {
        self.entities.insert(key.into(), value);
        self
    }

    pub fn entity_str(&self, key: &str) -> Option<&str> {
        self.entities.get(key).and_then(Value::as_str)
    }

    /// Capabilities the extractor flagged as needed, from the `capabilities`
    /// entity. Accepts either a single string or an array of strings.
    pub fn requested_capabilities(&self) -> Vec<&str> {
        match self.entities.get("capabilities") {
            Some(Value::String(single)) => vec![single.as_str()],
            Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }
}
