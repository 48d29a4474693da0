//! Context transfer between two agents.
//!
//! A handoff moves through validation, context preparation, persistence and
//! message generation. Any step can stop it; the caller always gets a
//! [`HandoffResult`] back rather than an error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, NoopAuditSink};
use crate::config::HandoffConfig;
use crate::domain::agent::AgentId;
use crate::domain::conversation::ConversationContext;
use crate::domain::handoff::{HandoffId, HandoffRecord, HandoffRequest, HandoffResult, HandoffStage};
use crate::domain::response::{Response, ResponseOutcome};
use crate::errors::{HandoffValidationError, PersistenceError};
use crate::handoff::message::{
    connecting_message, failure_message, synthesize_summary, SpecialtyTable, ACCEPT_MESSAGE,
};
use crate::handoff::store::HandoffStore;

const HANDLER_NAME: &str = "AgentHandoffProtocol";
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub struct HandoffProtocol {
    store: Arc<dyn HandoffStore>,
    specialties: SpecialtyTable,
    history_limit: u32,
    audit: Arc<dyn AuditSink>,
}

impl HandoffProtocol {
    pub fn new(store: Arc<dyn HandoffStore>, config: &HandoffConfig) -> Self {
        Self {
            store,
            specialties: SpecialtyTable::with_overrides(&config.specialties),
            history_limit: config.history_limit,
            audit: Arc::new(NoopAuditSink),
        }
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn specialties(&self) -> &SpecialtyTable {
        &self.specialties
    }

    pub async fn initiate_handoff(&self, request: HandoffRequest) -> HandoffResult {
        let session_id = request.session_id().to_owned();
        info!(
            event_name = "handoff.received",
            session_id = %session_id,
            from_agent_id = %request.from_agent_id,
            to_agent_id = %request.to_agent_id,
            urgency = request.urgency.as_str(),
            "handoff requested"
        );

        if let Err(error) = validate(&request) {
            warn!(
                event_name = "handoff.rejected",
                session_id = %session_id,
                error = %error,
                "handoff failed validation"
            );
            let detail = Some(error.to_string());
            self.emit(&request, "handoff.rejected", AuditOutcome::Rejected, detail);
            return failed_result(request, error.to_string(), HandoffStage::Validation);
        }
        debug!(event_name = "handoff.validated", session_id = %session_id, "handoff validated");

        let prepared = prepare_context(&request);
        debug!(
            event_name = "handoff.context_prepared",
            session_id = %session_id,
            has_summary = prepared.conversation_summary.is_some(),
            "handoff context prepared"
        );

        let handoff_id = generate_handoff_id(&request.from_agent_id, &request.to_agent_id);
        let timestamp = Utc::now();
        if let Err(error) = self.persist(&handoff_id, &request, &prepared, timestamp).await {
            warn!(
                event_name = "handoff.persist_failed",
                session_id = %session_id,
                handoff_id = %handoff_id,
                error = %error,
                "could not persist handoff"
            );
            self.emit(&request, "handoff.failed", AuditOutcome::Failed, Some(error.to_string()));
            return failed_result(request, error.to_string(), HandoffStage::Persistence);
        }
        debug!(
            event_name = "handoff.persisted",
            session_id = %session_id,
            handoff_id = %handoff_id,
            "handoff persisted"
        );

        let message = connecting_message(
            &request.to_agent_name,
            self.specialties.specialty_for(&request.to_agent_id),
            request.urgency,
            request.customer_context.as_ref(),
        );

        info!(
            event_name = "handoff.succeeded",
            session_id = %session_id,
            handoff_id = %handoff_id,
            to_agent_id = %request.to_agent_id,
            "handoff complete"
        );
        self.emit(&request, "handoff.initiated", AuditOutcome::Success, None);

        HandoffResult {
            success: true,
            handoff_id: Some(handoff_id),
            to_agent_id: request.to_agent_id,
            to_agent_name: request.to_agent_name,
            message,
            context: prepared,
            timestamp,
            error: None,
            failed_stage: None,
        }
    }

    async fn persist(
        &self,
        handoff_id: &HandoffId,
        request: &HandoffRequest,
        prepared: &ConversationContext,
        created_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let stored = HandoffRequest { conversation_context: prepared.clone(), ..request.clone() };
        let record = HandoffRecord::from_request(handoff_id.clone(), &stored, created_at)
            .map_err(|error| PersistenceError::Encode(error.to_string()))?;
        self.store.insert_handoff(record).await
    }

    /// Acknowledges a handoff on behalf of the receiving agent. Marking the
    /// stored record is best-effort and never changes the acknowledgement.
    pub async fn accept_handoff(&self, handoff_id: &HandoffId, agent_id: &AgentId) -> Response {
        let accepted_at = Utc::now();
        match self.store.mark_accepted(handoff_id, agent_id, accepted_at).await {
            Ok(true) => info!(
                event_name = "handoff.accepted",
                handoff_id = %handoff_id,
                agent_id = %agent_id,
                "handoff accepted"
            ),
            Ok(false) => warn!(
                event_name = "handoff.accept_unknown",
                handoff_id = %handoff_id,
                agent_id = %agent_id,
                "accepted handoff has no stored record"
            ),
            Err(error) => warn!(
                event_name = "handoff.accept_persist_failed",
                handoff_id = %handoff_id,
                error = %error,
                "could not mark handoff accepted"
            ),
        }

        self.audit.emit(
            AuditEvent::new(
                None,
                handoff_id.0.clone(),
                "handoff.accepted",
                AuditCategory::Handoff,
                agent_id.0.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("handoff_id", handoff_id.0.clone()),
        );

        Response::new(ACCEPT_MESSAGE, HANDLER_NAME).with_outcome(ResponseOutcome::HandoffAccepted {
            handoff_id: handoff_id.clone(),
            accepted_by: agent_id.clone(),
            timestamp: accepted_at,
        })
    }

    /// Handoffs for a session, newest first. Store failures read as empty.
    pub async fn get_handoff_history(&self, session_id: &str) -> Vec<HandoffRequest> {
        self.load_history(session_id, self.history_limit).await
    }

    pub async fn has_handoff_history(&self, session_id: &str) -> bool {
        !self.load_history(session_id, 1).await.is_empty()
    }

    pub async fn get_last_handoff(&self, session_id: &str) -> Option<HandoffRequest> {
        self.load_history(session_id, 1).await.into_iter().next()
    }

    async fn load_history(&self, session_id: &str, limit: u32) -> Vec<HandoffRequest> {
        let records = match self.store.query_handoffs_by_session(session_id, limit).await {
            Ok(records) => records,
            Err(error) => {
                warn!(
                    event_name = "handoff.history_unavailable",
                    session_id = %session_id,
                    error = %error,
                    "could not load handoff history"
                );
                return Vec::new();
            }
        };

        records
            .iter()
            .filter_map(|record| match record.to_request() {
                Ok(request) => Some(request),
                Err(error) => {
                    warn!(
                        event_name = "handoff.history_decode_failed",
                        handoff_id = %record.handoff_id,
                        error = %error,
                        "skipping undecodable handoff record"
                    );
                    None
                }
            })
            .collect()
    }

    pub async fn clear_history(&self, session_id: &str) {
        match self.store.delete_handoffs_by_session(session_id).await {
            Ok(removed) => info!(
                event_name = "handoff.history_cleared",
                session_id = %session_id,
                removed,
                "handoff history cleared"
            ),
            Err(error) => warn!(
                event_name = "handoff.history_clear_failed",
                session_id = %session_id,
                error = %error,
                "could not clear handoff history"
            ),
        }
    }

    pub async fn clear_all_history(&self) {
        match self.store.delete_all_handoffs().await {
            Ok(removed) => {
                info!(event_name = "handoff.history_purged", removed, "all handoff history cleared")
            }
            Err(error) => warn!(
                event_name = "handoff.history_purge_failed",
                error = %error,
                "could not clear all handoff history"
            ),
        }
    }

    fn emit(
        &self,
        request: &HandoffRequest,
        event_type: &str,
        outcome: AuditOutcome,
        error: Option<String>,
    ) {
        let correlation_id = request
            .metadata
            .get("correlation_id")
            .and_then(Value::as_str)
            .unwrap_or(request.session_id())
            .to_owned();

        let mut event = AuditEvent::new(
            Some(request.session_id().to_owned()),
            correlation_id,
            event_type,
            AuditCategory::Handoff,
            request.from_agent_id.0.clone(),
            outcome,
        )
        .with_metadata("to_agent_id", request.to_agent_id.0.clone())
        .with_metadata("urgency", request.urgency.as_str());
        if let Some(error) = error {
            event = event.with_metadata("error", error);
        }
        self.audit.emit(event);
    }
}

fn validate(request: &HandoffRequest) -> Result<(), HandoffValidationError> {
    if request.from_agent_id.as_str().trim().is_empty()
        || request.to_agent_id.as_str().trim().is_empty()
    {
        return Err(HandoffValidationError::MissingAgentId);
    }
    if request.from_agent_id == request.to_agent_id {
        return Err(HandoffValidationError::SameAgent);
    }
    if request.session_id().trim().is_empty() {
        return Err(HandoffValidationError::MissingSessionId);
    }
    if request.reason.trim().is_empty() {
        return Err(HandoffValidationError::MissingReason);
    }
    Ok(())
}

fn prepare_context(request: &HandoffRequest) -> ConversationContext {
    let mut context = request.conversation_context.clone();
    context
        .extracted_entities
        .insert("handoffReason".to_owned(), Value::String(request.reason.clone()));
    context
        .extracted_entities
        .insert("handoffFrom".to_owned(), Value::String(request.from_agent_name.clone()));
    context
        .extracted_entities
        .insert("handoffUrgency".to_owned(), Value::String(request.urgency.as_str().to_owned()));

    if context.conversation_summary.is_none() && !context.messages.is_empty() {
        context.conversation_summary = synthesize_summary(&context);
    }

    context
}

/// `handoff_{from}_{to}_{unix millis}_{6 base36 chars}`
pub fn generate_handoff_id(from: &AgentId, to: &AgentId) -> HandoffId {
    let mut rng = rand::thread_rng();
    let suffix: String =
        (0..6).map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())])).collect();
    HandoffId(format!("handoff_{from}_{to}_{}_{suffix}", Utc::now().timestamp_millis()))
}

fn failed_result(request: HandoffRequest, error: String, stage: HandoffStage) -> HandoffResult {
    HandoffResult {
        success: false,
        handoff_id: None,
        message: failure_message(&request.to_agent_name),
        to_agent_id: request.to_agent_id,
        to_agent_name: request.to_agent_name,
        context: request.conversation_context,
        timestamp: Utc::now(),
        error: Some(error),
        failed_stage: Some(stage),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use serde_json::json;

    use super::{generate_handoff_id, HandoffProtocol};
    use crate::audit::{AuditOutcome, InMemoryAuditSink};
    use crate::config::HandoffConfig;
    use crate::domain::agent::AgentId;
    use crate::domain::conversation::{ConversationContext, ConversationMessage, CustomerContext};
    use crate::domain::handoff::{
        HandoffId, HandoffOptions, HandoffRecord, HandoffRequest, HandoffStage, HandoffStatus,
        Urgency,
    };
    use crate::errors::PersistenceError;
    use crate::handoff::store::{HandoffStore, InMemoryHandoffStore};

    struct UnavailableStore;

    #[async_trait]
    impl HandoffStore for UnavailableStore {
        async fn insert_handoff(&self, _record: HandoffRecord) -> Result<(), PersistenceError> {
            Err(PersistenceError::Unavailable("database is locked".to_owned()))
        }

        async fn query_handoffs_by_session(
            &self,
            _session_id: &str,
            _limit: u32,
        ) -> Result<Vec<HandoffRecord>, PersistenceError> {
            Err(PersistenceError::Unavailable("database is locked".to_owned()))
        }

        async fn mark_accepted(
            &self,
            _handoff_id: &HandoffId,
            _accepted_by: &AgentId,
            _accepted_at: DateTime<Utc>,
        ) -> Result<bool, PersistenceError> {
            Err(PersistenceError::Unavailable("database is locked".to_owned()))
        }

        async fn delete_handoffs_by_session(
            &self,
            _session_id: &str,
        ) -> Result<u64, PersistenceError> {
            Err(PersistenceError::Unavailable("database is locked".to_owned()))
        }

        async fn delete_all_handoffs(&self) -> Result<u64, PersistenceError> {
            Err(PersistenceError::Unavailable("database is locked".to_owned()))
        }
    }

    fn protocol(store: Arc<InMemoryHandoffStore>) -> HandoffProtocol {
        HandoffProtocol::new(store, &HandoffConfig::default())
    }

    fn refund_request(session_id: &str) -> HandoffRequest {
        HandoffRequest::new(
            "sales-agent",
            "Sales",
            "customer-service-agent",
            "Support",
            "refund",
            ConversationContext::new(session_id).with_message(ConversationMessage::user("refund?")),
        )
    }

    #[tokio::test]
    async fn successful_handoff_persists_prepared_context() {
        let store = Arc::new(InMemoryHandoffStore::new());
        let protocol = protocol(store.clone());

        let result = protocol.initiate_handoff(refund_request("s1")).await;

        assert!(result.success, "unexpected failure: {:?}", result.error);
        assert_eq!(result.failed_stage, None);
        assert!(result
            .message
            .contains("who specializes in customer support and order assistance"));
        assert_eq!(
            result.context.conversation_summary.as_deref(),
            Some("Customer asked: \"refund?\"")
        );
        assert_eq!(result.context.extracted_entities.get("handoffReason"), Some(&json!("refund")));
        assert_eq!(result.context.extracted_entities.get("handoffFrom"), Some(&json!("Sales")));
        assert_eq!(result.context.extracted_entities.get("handoffUrgency"), Some(&json!("normal")));
        assert_eq!(store.len().await, 1);

        let last = protocol.get_last_handoff("s1").await.expect("last handoff");
        assert_eq!(last.reason, "refund");
        assert_eq!(last.to_agent_id, AgentId::from("customer-service-agent"));
        assert_eq!(last.to_agent_name, "Support");
        assert!(protocol.has_handoff_history("s1").await);
    }

    #[tokio::test]
    async fn existing_summary_is_preserved() {
        let protocol = protocol(Arc::new(InMemoryHandoffStore::new()));
        let mut request = refund_request("s1");
        request.conversation_context =
            request.conversation_context.with_summary("Customer wants a refund on order 7");

        let result = protocol.initiate_handoff(request).await;

        assert_eq!(
            result.context.conversation_summary.as_deref(),
            Some("Customer wants a refund on order 7")
        );
    }

    #[tokio::test]
    async fn empty_conversation_is_handed_off_without_summary() {
        let protocol = protocol(Arc::new(InMemoryHandoffStore::new()));
        let request = HandoffRequest::new(
            "sales",
            "Sales",
            "support",
            "Support",
            "billing question",
            ConversationContext::new("s1"),
        );

        let result = protocol.initiate_handoff(request).await;

        assert!(result.success, "unexpected failure: {:?}", result.error);
        assert_eq!(result.context.conversation_summary, None);
        let stored = protocol.get_last_handoff("s1").await.expect("last handoff");
        assert_eq!(stored.conversation_context.conversation_summary, None);
    }

    #[tokio::test]
    async fn same_agent_is_rejected_without_persisting() {
        let store = Arc::new(InMemoryHandoffStore::new());
        let protocol = protocol(store.clone());
        let mut request = refund_request("s1");
        request.to_agent_id = request.from_agent_id.clone();

        let result = protocol.initiate_handoff(request).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Cannot handoff to the same agent"));
        assert_eq!(result.failed_stage, Some(HandoffStage::Validation));
        assert_eq!(
            result.message,
            "I'm having trouble connecting you with Support. Let me try again."
        );
        assert!(result.handoff_id.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn validation_reports_first_violation() {
        let protocol = protocol(Arc::new(InMemoryHandoffStore::new()));

        let mut missing_id = refund_request("s1");
        missing_id.from_agent_id = AgentId::from("");
        let mut missing_session = refund_request("s1");
        missing_session.conversation_context.session_id = "  ".to_owned();
        let mut missing_reason = refund_request("s1");
        missing_reason.reason = String::new();

        let cases = [
            (missing_id, "Both fromAgentId and toAgentId are required"),
            (missing_session, "Conversation context with sessionId is required"),
            (missing_reason, "Handoff reason is required"),
        ];

        for (request, expected) in cases {
            let result = protocol.initiate_handoff(request).await;
            assert_eq!(result.error.as_deref(), Some(expected));
        }
        assert!(!protocol.has_handoff_history("s1").await);
    }

    #[tokio::test]
    async fn persistence_failure_becomes_failure_result() {
        let protocol = HandoffProtocol::new(Arc::new(UnavailableStore), &HandoffConfig::default());

        let result = protocol.initiate_handoff(refund_request("s1")).await;

        assert!(!result.success);
        assert_eq!(result.failed_stage, Some(HandoffStage::Persistence));
        assert_eq!(
            result.error.as_deref(),
            Some("handoff store unavailable: database is locked")
        );
        assert!(result.message.starts_with("I'm having trouble connecting you with Support"));
    }

    #[tokio::test]
    async fn history_queries_degrade_when_store_is_down() {
        let protocol = HandoffProtocol::new(Arc::new(UnavailableStore), &HandoffConfig::default());

        assert!(protocol.get_handoff_history("s1").await.is_empty());
        assert!(!protocol.has_handoff_history("s1").await);
        assert!(protocol.get_last_handoff("s1").await.is_none());
        protocol.clear_history("s1").await;
        protocol.clear_all_history().await;

        let response =
            protocol.accept_handoff(&HandoffId("handoff_x".to_owned()), &AgentId::from("b")).await;
        assert_eq!(
            response.content,
            "Thanks for the handoff! I've got all the context and I'm ready to help."
        );
    }

    #[tokio::test]
    async fn urgent_vip_handoff_decorates_message() {
        let protocol = protocol(Arc::new(InMemoryHandoffStore::new()));
        let request = refund_request("s1").with_options(
            HandoffOptions::urgent(Urgency::High).with_customer(CustomerContext::vip()),
        );

        let result = protocol.initiate_handoff(request).await;

        assert!(result.message.starts_with("⚡ I'm connecting you with Support"));
        assert!(result.message.contains("As a VIP customer"));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let store = Arc::new(InMemoryHandoffStore::new());
        let protocol = HandoffProtocol::new(
            store.clone(),
            &HandoffConfig { history_limit: 2, ..HandoffConfig::default() },
        );

        for reason in ["first", "second", "third"] {
            let mut request = refund_request("s1");
            request.reason = reason.to_owned();
            protocol.initiate_handoff(request).await;
        }
        protocol.initiate_handoff(refund_request("s2")).await;

        let history = protocol.get_handoff_history("s1").await;
        let reasons: Vec<&str> = history.iter().map(|request| request.reason.as_str()).collect();
        assert_eq!(reasons, vec!["third", "second"]);

        protocol.clear_history("s1").await;
        assert!(!protocol.has_handoff_history("s1").await);
        assert!(protocol.has_handoff_history("s2").await);

        protocol.clear_all_history().await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn accept_marks_stored_record() {
        let store = Arc::new(InMemoryHandoffStore::new());
        let audit = InMemoryAuditSink::default();
        let protocol = protocol(store.clone()).with_audit_sink(Arc::new(audit.clone()));

        let result = protocol.initiate_handoff(refund_request("s1")).await;
        let handoff_id = result.handoff_id.expect("handoff id");
        let response =
            protocol.accept_handoff(&handoff_id, &AgentId::from("customer-service-agent")).await;

        assert_eq!(
            response.content,
            "Thanks for the handoff! I've got all the context and I'm ready to help."
        );
        let records = store.query_handoffs_by_session("s1", 10).await.expect("records");
        assert_eq!(records[0].status, HandoffStatus::Accepted);
        assert_eq!(records[0].accepted_by, Some(AgentId::from("customer-service-agent")));

        let initiated = audit.events_of_type("handoff.initiated");
        assert_eq!(initiated.len(), 1);
        assert_eq!(initiated[0].outcome, AuditOutcome::Success);
        assert_eq!(audit.events_of_type("handoff.accepted").len(), 1);
    }

    #[test]
    fn handoff_id_has_expected_shape() {
        let id = generate_handoff_id(&AgentId::from("sales"), &AgentId::from("support"));
        let parts: Vec<&str> = id.0.split('_').collect();

        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0], "handoff");
        assert_eq!(parts[1], "sales");
        assert_eq!(parts[2], "support");
        assert!(parts[3].parse::<i64>().is_ok());
        assert_eq!(parts[4].len(), 6);
        assert!(parts[4].chars().all(|ch| ch.is_ascii_digit() || ch.is_ascii_lowercase()));
    }
}
