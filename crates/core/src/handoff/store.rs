use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::agent::AgentId;
use crate::domain::handoff::{HandoffId, HandoffRecord, HandoffStatus};
use crate::errors::PersistenceError;

/// Persistence collaborator for handoff records.
#[async_trait]
pub trait HandoffStore: Send + Sync {
    async fn insert_handoff(&self, record: HandoffRecord) -> Result<(), PersistenceError>;

    /// Records for one session, newest first, at most `limit` of them.
    async fn query_handoffs_by_session(
        &self,
        session_id: &str,
        limit: u32,
    ) -> Result<Vec<HandoffRecord>, PersistenceError>;

    /// Returns `false` when no record has `handoff_id`.
    async fn mark_accepted(
        &self,
        handoff_id: &HandoffId,
        accepted_by: &AgentId,
        accepted_at: DateTime<Utc>,
    ) -> Result<bool, PersistenceError>;

    async fn delete_handoffs_by_session(&self, session_id: &str) -> Result<u64, PersistenceError>;

    async fn delete_all_handoffs(&self) -> Result<u64, PersistenceError>;
}

#[derive(Default)]
pub struct InMemoryHandoffStore {
    records: RwLock<Vec<HandoffRecord>>,
}

impl InMemoryHandoffStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl HandoffStore for InMemoryHandoffStore {
    async fn insert_handoff(&self, record: HandoffRecord) -> Result<(), PersistenceError> {
        let mut records = self.records.write().await;
        records.push(record);
        Ok(())
    }

    async fn query_handoffs_by_session(
        &self,
        session_id: &str,
        limit: u32,
    ) -> Result<Vec<HandoffRecord>, PersistenceError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .filter(|record| record.session_id == session_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn mark_accepted(
        &self,
        handoff_id: &HandoffId,
        accepted_by: &AgentId,
        accepted_at: DateTime<Utc>,
    ) -> Result<bool, PersistenceError> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|record| &record.handoff_id == handoff_id) {
            Some(record) => {
                record.status = HandoffStatus::Accepted;
                record.accepted_by = Some(accepted_by.clone());
                record.accepted_at = Some(accepted_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_handoffs_by_session(&self, session_id: &str) -> Result<u64, PersistenceError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|record| record.session_id != session_id);
        Ok((before - records.len()) as u64)
    }

    async fn delete_all_handoffs(&self) -> Result<u64, PersistenceError> {
        let mut records = self.records.write().await;
        let removed = records.len() as u64;
        records.clear();
        Ok(removed)
    }
}
