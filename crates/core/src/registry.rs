//! In-process directory of agents.
//!
//! Lookups that feed routing only consider active agents and return them by
//! descending priority. Equal priorities keep registration order; an agent
//! that is registered again keeps the slot of its first registration.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::agent::{Agent, AgentId, AgentStatus, CapabilityPredicate};
use crate::domain::intent::Intent;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub coming_soon: usize,
    pub by_type: BTreeMap<String, usize>,
}

struct Entry {
    sequence: u64,
    agent: Arc<Agent>,
}

#[derive(Default)]
struct Directory {
    entries: HashMap<AgentId, Entry>,
    next_sequence: u64,
}

impl Directory {
    fn ordered(&self) -> Vec<&Entry> {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by_key(|entry| entry.sequence);
        entries
    }

    fn ranked<F>(&self, keep: F) -> Vec<Arc<Agent>>
    where
        F: Fn(&Agent) -> bool,
    {
        let mut matched: Vec<&Entry> =
            self.entries.values().filter(|entry| keep(entry.agent.as_ref())).collect();
        matched.sort_by(|left, right| {
            right
                .agent
                .priority()
                .cmp(&left.agent.priority())
                .then(left.sequence.cmp(&right.sequence))
        });
        matched.into_iter().map(|entry| Arc::clone(&entry.agent)).collect()
    }
}

#[derive(Default)]
pub struct CapabilityRegistry {
    directory: RwLock<Directory>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agents<I>(agents: I) -> Self
    where
        I: IntoIterator<Item = Agent>,
    {
        let registry = Self::new();
        for agent in agents {
            registry.register(agent);
        }
        registry
    }

    fn read(&self) -> RwLockReadGuard<'_, Directory> {
        match self.directory.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Directory> {
        match self.directory.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn register(&self, agent: Agent) {
        let id = agent.id().clone();
        let mut directory = self.write();

        let sequence = match directory.entries.get(&id).map(|entry| entry.sequence) {
            Some(existing) => {
                warn!(
                    event_name = "registry.agent_overwritten",
                    agent_id = %id,
                    "agent already registered, overwriting"
                );
                existing
            }
            None => {
                let sequence = directory.next_sequence;
                directory.next_sequence += 1;
                sequence
            }
        };

        info!(
            event_name = "registry.agent_registered",
            agent_id = %id,
            agent_name = %agent.name(),
            status = agent.metadata.status.as_str(),
            priority = agent.priority(),
            "agent registered"
        );
        directory.entries.insert(id, Entry { sequence, agent: Arc::new(agent) });
    }

    pub fn unregister(&self, id: &AgentId) -> bool {
        let removed = self.write().entries.remove(id).is_some();
        if removed {
            info!(event_name = "registry.agent_unregistered", agent_id = %id, "agent unregistered");
        }
        removed
    }

    pub fn get(&self, id: &AgentId) -> Option<Arc<Agent>> {
        self.read().entries.get(id).map(|entry| Arc::clone(&entry.agent))
    }

    /// Every agent in registration order.
    pub fn list_all(&self) -> Vec<Arc<Agent>> {
        self.read().ordered().into_iter().map(|entry| Arc::clone(&entry.agent)).collect()
    }

    pub fn list_active(&self) -> Vec<Arc<Agent>> {
        self.read()
            .ordered()
            .into_iter()
            .filter(|entry| entry.agent.metadata.is_active())
            .map(|entry| Arc::clone(&entry.agent))
            .collect()
    }

    pub fn find_capable(&self, intent: &Intent) -> Vec<Arc<Agent>> {
        self.read().ranked(|agent| agent.metadata.is_active() && agent.can_handle(intent))
    }

    pub fn find_contributing(&self, intent: &Intent) -> Vec<Arc<Agent>> {
        self.read().ranked(|agent| agent.metadata.is_active() && agent.can_contribute(intent))
    }

    /// Coming-soon agents that would handle the intent once launched.
    pub fn find_upcoming(&self, intent: &Intent) -> Vec<Arc<Agent>> {
        self.read().ranked(|agent| {
            agent.metadata.status == AgentStatus::ComingSoon && agent.can_handle(intent)
        })
    }

    pub fn find_by_capability(&self, capability: &str) -> Vec<Arc<Agent>> {
        self.read().ranked(|agent| {
            agent.metadata.is_active() && agent.metadata.capabilities.contains(capability)
        })
    }

    pub fn find_by_type(&self, agent_type: &str) -> Vec<Arc<Agent>> {
        self.read().ranked(|agent| agent.metadata.agent_type == agent_type)
    }

    pub fn has_capable(&self, intent: &Intent) -> bool {
        self.read()
            .entries
            .values()
            .any(|entry| entry.agent.metadata.is_active() && entry.agent.can_handle(intent))
    }

    pub fn stats(&self) -> RegistryStats {
        let directory = self.read();
        let mut stats =
            RegistryStats { total: directory.entries.len(), ..RegistryStats::default() };

        for entry in directory.entries.values() {
            match entry.agent.metadata.status {
                AgentStatus::Active => stats.active += 1,
                AgentStatus::Inactive => stats.inactive += 1,
                AgentStatus::ComingSoon => stats.coming_soon += 1,
            }
            *stats.by_type.entry(entry.agent.metadata.agent_type.clone()).or_insert(0) += 1;
        }

        stats
    }

    pub fn clear(&self) {
        let mut directory = self.write();
        directory.entries.clear();
        directory.next_sequence = 0;
        info!(event_name = "registry.cleared", "registry cleared");
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
