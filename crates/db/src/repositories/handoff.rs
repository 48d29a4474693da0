use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use switchboard_core::domain::agent::AgentId;
use switchboard_core::domain::handoff::{HandoffId, HandoffRecord, HandoffStatus, Urgency};
use switchboard_core::errors::PersistenceError;
use switchboard_core::handoff::HandoffStore;

use super::RepositoryError;
use crate::DbPool;

const SELECT_COLUMNS: &str = "SELECT handoff_id, session_id, from_agent_id, from_agent_name,
        to_agent_id, to_agent_name, reason, urgency, context_json, customer_json,
        metadata_json, status, accepted_by, accepted_at, created_at
 FROM agent_handoffs";

/// `HandoffStore` backed by the `agent_handoffs` table.
pub struct SqlHandoffRepository {
    pool: DbPool,
}

impl SqlHandoffRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, record: &HandoffRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO agent_handoffs (handoff_id, session_id, from_agent_id, from_agent_name,
                                         to_agent_id, to_agent_name, reason, urgency,
                                         context_json, customer_json, metadata_json, status,
                                         accepted_by, accepted_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.handoff_id.0)
        .bind(&record.session_id)
        .bind(&record.from_agent_id.0)
        .bind(&record.from_agent_name)
        .bind(&record.to_agent_id.0)
        .bind(&record.to_agent_name)
        .bind(&record.reason)
        .bind(record.urgency.as_str())
        .bind(&record.context_json)
        .bind(&record.customer_json)
        .bind(&record.metadata_json)
        .bind(record.status.as_str())
        .bind(record.accepted_by.as_ref().map(|agent| agent.0.clone()))
        .bind(record.accepted_at.map(format_timestamp))
        .bind(format_timestamp(record.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn by_session(
        &self,
        session_id: &str,
        limit: u32,
    ) -> Result<Vec<HandoffRecord>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE session_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?"
        ))
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }
}

fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid timestamp `{value}`: {error}")))
}

fn column<'r, T>(row: &'r sqlx::sqlite::SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(|error| RepositoryError::Decode(error.to_string()))
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<HandoffRecord, RepositoryError> {
    let urgency: String = column(row, "urgency")?;
    let status: String = column(row, "status")?;
    let accepted_by: Option<String> = column(row, "accepted_by")?;
    let accepted_at: Option<String> = column(row, "accepted_at")?;
    let created_at: String = column(row, "created_at")?;

    Ok(HandoffRecord {
        handoff_id: HandoffId(column(row, "handoff_id")?),
        session_id: column(row, "session_id")?,
        from_agent_id: AgentId(column(row, "from_agent_id")?),
        from_agent_name: column(row, "from_agent_name")?,
        to_agent_id: AgentId(column(row, "to_agent_id")?),
        to_agent_name: column(row, "to_agent_name")?,
        reason: column(row, "reason")?,
        urgency: Urgency::parse(&urgency)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown urgency `{urgency}`")))?,
        context_json: column(row, "context_json")?,
        customer_json: column(row, "customer_json")?,
        metadata_json: column(row, "metadata_json")?,
        status: HandoffStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown status `{status}`")))?,
        accepted_by: accepted_by.map(AgentId),
        accepted_at: accepted_at.as_deref().map(parse_timestamp).transpose()?,
        created_at: parse_timestamp(&created_at)?,
    })
}

#[async_trait]
impl HandoffStore for SqlHandoffRepository {
    async fn insert_handoff(&self, record: HandoffRecord) -> Result<(), PersistenceError> {
        self.insert(&record).await.map_err(PersistenceError::from)
    }

    async fn query_handoffs_by_session(
        &self,
        session_id: &str,
        limit: u32,
    ) -> Result<Vec<HandoffRecord>, PersistenceError> {
        self.by_session(session_id, limit).await.map_err(PersistenceError::from)
    }

    async fn mark_accepted(
        &self,
        handoff_id: &HandoffId,
        accepted_by: &AgentId,
        accepted_at: DateTime<Utc>,
    ) -> Result<bool, PersistenceError> {
        let result = sqlx::query(
            "UPDATE agent_handoffs
             SET status = 'accepted', accepted_by = ?, accepted_at = ?
             WHERE handoff_id = ?",
        )
        .bind(&accepted_by.0)
        .bind(format_timestamp(accepted_at))
        .bind(&handoff_id.0)
        .execute(&self.pool)
        .await
        .map_err(|error| PersistenceError::from(RepositoryError::from(error)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_handoffs_by_session(&self, session_id: &str) -> Result<u64, PersistenceError> {
        let result = sqlx::query("DELETE FROM agent_handoffs WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|error| PersistenceError::from(RepositoryError::from(error)))?;

        Ok(result.rows_affected())
    }

    async fn delete_all_handoffs(&self) -> Result<u64, PersistenceError> {
        let result = sqlx::query("DELETE FROM agent_handoffs")
            .execute(&self.pool)
            .await
            .map_err(|error| PersistenceError::from(RepositoryError::from(error)))?;

        Ok(result.rows_affected())
    }
}
