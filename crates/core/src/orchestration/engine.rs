use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{info, warn};

use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, NoopAuditSink};
use crate::config::OrchestrationConfig;
use crate::domain::agent::Agent;
use crate::domain::conversation::{ConversationContext, TurnContext};
use crate::domain::handoff::{HandoffOptions, HandoffRequest};
use crate::domain::intent::Intent;
use crate::domain::orchestration::{
    ExecutionStrategy, OrchestrationPlan, OrchestrationResult, OrchestrationStep,
    OrchestrationSummary, StepResult,
};
use crate::domain::response::{Response, ResponseOutcome};
use crate::errors::{PlanValidationError, StepExecutionError};
use crate::handoff::protocol::HandoffProtocol;
use crate::orchestration::executor::{AgentExecutor, StepTask};
use crate::orchestration::plan::{build_plan, dependency_levels};

const HANDLER_NAME: &str = "AgentOrchestrator";

pub const ORCHESTRATION_FAILED_MESSAGE: &str = "I coordinated with multiple specialists, but \
     encountered some issues. Let me try a different approach.";

/// Coordinates several agents within one turn and delegates handoffs.
pub struct Orchestrator {
    executor: Arc<dyn AgentExecutor>,
    handoff: Arc<HandoffProtocol>,
    config: OrchestrationConfig,
    audit: Arc<dyn AuditSink>,
}

impl Orchestrator {
    pub fn new(
        executor: Arc<dyn AgentExecutor>,
        handoff: Arc<HandoffProtocol>,
        config: OrchestrationConfig,
    ) -> Self {
        Self { executor, handoff, config, audit: Arc::new(NoopAuditSink) }
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn handoff_protocol(&self) -> &Arc<HandoffProtocol> {
        &self.handoff
    }

    pub async fn orchestrate(
        &self,
        message: &str,
        intent: &Intent,
        context: &TurnContext,
        agents: &[Arc<Agent>],
    ) -> Response {
        self.orchestrate_with(message, intent, context, agents, self.config.default_strategy).await
    }

    pub async fn orchestrate_with(
        &self,
        message: &str,
        intent: &Intent,
        context: &TurnContext,
        agents: &[Arc<Agent>],
        strategy: ExecutionStrategy,
    ) -> Response {
        let plan = self.create_plan(intent, agents, strategy);
        self.run_plan(&plan, message, intent, context).await
    }

    /// Executes a caller-supplied plan and aggregates the outcome.
    pub async fn run_plan(
        &self,
        plan: &OrchestrationPlan,
        message: &str,
        intent: &Intent,
        context: &TurnContext,
    ) -> Response {
        let started = Instant::now();
        info!(
            event_name = "orchestration.start",
            correlation_id = %context.correlation_id,
            strategy = plan.strategy.as_str(),
            steps = plan.steps.len(),
            estimated_ms = plan.estimated_time.as_millis() as u64,
            "orchestration plan created"
        );

        let response = match self.execute_plan(plan, message, intent, context).await {
            Ok(result) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                self.aggregate_results(plan, &result, elapsed_ms)
            }
            Err(error) => {
                warn!(
                    event_name = "orchestration.plan_invalid",
                    correlation_id = %context.correlation_id,
                    error = %error,
                    "orchestration plan rejected"
                );
                let summary = OrchestrationSummary {
                    success: false,
                    strategy: plan.strategy,
                    agents_involved: plan.agent_names(),
                    steps_completed: 0,
                    total_steps: plan.steps.len(),
                    elapsed_ms: started.elapsed().as_millis() as u64,
                    error: Some(error.to_string()),
                };
                Response::new(ORCHESTRATION_FAILED_MESSAGE, HANDLER_NAME)
                    .with_outcome(ResponseOutcome::Orchestration(summary))
            }
        };

        if let Some(summary) = response.orchestration() {
            info!(
                event_name = "orchestration.complete",
                correlation_id = %context.correlation_id,
                success = summary.success,
                steps_completed = summary.steps_completed,
                total_steps = summary.total_steps,
                elapsed_ms = summary.elapsed_ms,
                "orchestration finished"
            );
            self.audit.emit(
                AuditEvent::new(
                    context.session_id.clone(),
                    context.correlation_id.clone(),
                    "orchestration.completed",
                    AuditCategory::Orchestration,
                    HANDLER_NAME,
                    if summary.success { AuditOutcome::Success } else { AuditOutcome::Failed },
                )
                .with_metadata("strategy", summary.strategy.as_str())
                .with_metadata("agents", summary.agents_involved.join(",")),
            );
        }

        response
    }

    pub fn create_plan(
        &self,
        intent: &Intent,
        agents: &[Arc<Agent>],
        strategy: ExecutionStrategy,
    ) -> OrchestrationPlan {
        build_plan(intent, agents, strategy, self.config.estimated_step())
    }

    /// Runs every step according to the plan strategy. Step failures are
    /// recorded, never propagated; only a malformed plan is an error.
    pub async fn execute_plan(
        &self,
        plan: &OrchestrationPlan,
        message: &str,
        intent: &Intent,
        context: &TurnContext,
    ) -> Result<OrchestrationResult, PlanValidationError> {
        let levels = dependency_levels(plan)?;
        let started = Instant::now();

        let results = match plan.strategy {
            ExecutionStrategy::Sequential => {
                let mut results = Vec::with_capacity(plan.steps.len());
                for step in &plan.steps {
                    let result = self.execute_step(step, message, intent, context).await;
                    if !result.success {
                        warn!(
                            event_name = "orchestration.step_failed",
                            correlation_id = %context.correlation_id,
                            step_number = step.step_number,
                            "step failed, continuing"
                        );
                    }
                    results.push(result);
                }
                results
            }
            ExecutionStrategy::Parallel => {
                join_all(
                    plan.steps.iter().map(|step| self.execute_step(step, message, intent, context)),
                )
                .await
            }
            ExecutionStrategy::Hybrid => {
                let mut results = Vec::with_capacity(plan.steps.len());
                for level in levels {
                    let steps = plan.steps.iter().filter(|step| level.contains(&step.step_number));
                    let running =
                        steps.map(|step| self.execute_step(step, message, intent, context));
                    results.extend(join_all(running).await);
                }
                results
            }
        };

        Ok(OrchestrationResult::from_steps(results, started.elapsed()))
    }

    pub async fn execute_step(
        &self,
        step: &OrchestrationStep,
        message: &str,
        intent: &Intent,
        context: &TurnContext,
    ) -> StepResult {
        let started = Instant::now();
        let task = StepTask {
            step_number: step.step_number,
            action: &step.action,
            message,
            intent,
            context,
        };

        let execution = self.executor.execute(&step.agent, task);
        let outcome = match self.config.step_timeout() {
            Some(limit) => tokio::time::timeout(limit, execution)
                .await
                .unwrap_or(Err(StepExecutionError::Timeout)),
            None => execution.await,
        };

        let elapsed = started.elapsed();
        match outcome {
            Ok(output) => StepResult {
                step_number: step.step_number,
                agent_id: step.agent.id().clone(),
                success: true,
                output: Some(output),
                error: None,
                elapsed,
            },
            Err(error) => {
                warn!(
                    event_name = "orchestration.step_error",
                    correlation_id = %context.correlation_id,
                    step_number = step.step_number,
                    agent_id = %step.agent.id(),
                    error = %error,
                    "agent step failed"
                );
                StepResult {
                    step_number: step.step_number,
                    agent_id: step.agent.id().clone(),
                    success: false,
                    output: None,
                    error: Some(error.to_string()),
                    elapsed,
                }
            }
        }
    }

    pub fn aggregate_results(
        &self,
        plan: &OrchestrationPlan,
        result: &OrchestrationResult,
        elapsed_ms: u64,
    ) -> Response {
        let agent_names = plan.agent_names();
        let summary = OrchestrationSummary {
            success: result.success,
            strategy: plan.strategy,
            agents_involved: agent_names.clone(),
            steps_completed: result.successful_steps(),
            total_steps: plan.steps.len(),
            elapsed_ms,
            error: None,
        };

        if !result.success {
            return Response::new(ORCHESTRATION_FAILED_MESSAGE, HANDLER_NAME)
                .with_outcome(ResponseOutcome::Orchestration(summary));
        }

        let outputs: Vec<&str> =
            result.steps.iter().filter_map(|step| step.output.as_deref()).collect();
        let content = format!(
            "I've coordinated with {} to help you.\n\n{}",
            agent_names.join(", "),
            outputs.join("\n\n")
        );

        Response::new(content, HANDLER_NAME).with_outcome(ResponseOutcome::Orchestration(summary))
    }

    /// Transfers the conversation from `from` to `to` through the protocol.
    pub async fn handoff(
        &self,
        from: &Agent,
        to: &Agent,
        context: ConversationContext,
        reason: &str,
        options: HandoffOptions,
    ) -> Response {
        let request = HandoffRequest::between(from, to, reason, context).with_options(options);
        let result = self.handoff.initiate_handoff(request).await;

        match (result.success, result.handoff_id) {
            (true, Some(handoff_id)) => Response::new(result.message, HANDLER_NAME).with_outcome(
                ResponseOutcome::HandoffInitiated {
                    handoff_id,
                    from_agent_id: from.id().clone(),
                    to_agent_id: result.to_agent_id,
                    to_agent_name: result.to_agent_name,
                    context: result.context,
                    timestamp: result.timestamp,
                },
            ),
            _ => Response::new(result.message, HANDLER_NAME).with_outcome(
                ResponseOutcome::HandoffFailed {
                    from_agent_id: from.id().clone(),
                    to_agent_id: to.id().clone(),
                    error: result.error.unwrap_or_else(|| "handoff failed".to_owned()),
                },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{Orchestrator, ORCHESTRATION_FAILED_MESSAGE};
    use crate::audit::InMemoryAuditSink;
    use crate::config::{HandoffConfig, OrchestrationConfig};
    use crate::domain::agent::{Agent, AgentMetadata};
    use crate::domain::conversation::{ConversationContext, ConversationMessage, TurnContext};
    use crate::domain::handoff::HandoffOptions;
    use crate::domain::intent::Intent;
    use crate::domain::orchestration::{ExecutionStrategy, OrchestrationPlan, OrchestrationStep};
    use crate::domain::response::ResponseOutcome;
    use crate::errors::StepExecutionError;
    use crate::handoff::{HandoffProtocol, InMemoryHandoffStore};
    use crate::orchestration::executor::{AgentExecutor, StepTask};

    #[derive(Default)]
    struct ScriptedExecutor {
        failing: BTreeSet<String>,
        slow: BTreeSet<String>,
        calls: Mutex<Vec<u32>>,
    }

    impl ScriptedExecutor {
        fn failing(ids: &[&str]) -> Self {
            Self { failing: ids.iter().map(|id| id.to_string()).collect(), ..Self::default() }
        }

        fn slow(ids: &[&str]) -> Self {
            Self { slow: ids.iter().map(|id| id.to_string()).collect(), ..Self::default() }
        }

        fn calls(&self) -> Vec<u32> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    #[async_trait]
    impl AgentExecutor for ScriptedExecutor {
        async fn execute(
            &self,
            agent: &Agent,
            task: StepTask<'_>,
        ) -> Result<String, StepExecutionError> {
            self.calls.lock().expect("calls lock").push(task.step_number);
            if self.slow.contains(agent.id().as_str()) {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            if self.failing.contains(agent.id().as_str()) {
                return Err(StepExecutionError::Agent(format!("{} is offline", agent.name())));
            }
            Ok(format!("{} handled {}", agent.name(), task.action))
        }
    }

    fn agent(id: &str, name: &str) -> Arc<Agent> {
        Arc::new(Agent::intent_matcher(AgentMetadata::new(id, "test", name)))
    }

    fn orchestrator(executor: Arc<ScriptedExecutor>, config: OrchestrationConfig) -> Orchestrator {
        let protocol = HandoffProtocol::new(
            Arc::new(InMemoryHandoffStore::new()),
            &HandoffConfig::default(),
        );
        Orchestrator::new(executor, Arc::new(protocol), config)
    }

    fn intent() -> Intent {
        Intent::new("multi-step", "plan")
    }

    #[tokio::test]
    async fn sequential_success_aggregates_outputs_in_order() {
        let executor = Arc::new(ScriptedExecutor::default());
        let orchestrator = orchestrator(executor.clone(), OrchestrationConfig::default());
        let agents = [agent("a", "Alpha"), agent("b", "Beta")];

        let context = TurnContext::new("corr-1");
        let response = orchestrator.orchestrate("plan it", &intent(), &context, &agents).await;

        assert!(response.orchestration_success());
        assert_eq!(
            response.content,
            "I've coordinated with Alpha, Beta to help you.\n\n\
             Alpha handled Process multi-step with Alpha\n\n\
             Beta handled Process multi-step with Beta"
        );
        let summary = response.orchestration().expect("summary");
        assert_eq!(summary.steps_completed, 2);
        assert_eq!(summary.total_steps, 2);
        assert_eq!(summary.strategy, ExecutionStrategy::Sequential);
        assert_eq!(response.metadata.handler_name, "AgentOrchestrator");
        assert_eq!(executor.calls(), vec![1, 2]);
    }

    #[tokio::test]
    async fn sequential_continues_after_failed_step() {
        let executor = Arc::new(ScriptedExecutor::failing(&["a"]));
        let orchestrator = orchestrator(executor.clone(), OrchestrationConfig::default());
        let agents = [agent("a", "Alpha"), agent("b", "Beta")];

        let context = TurnContext::new("corr-1");
        let response = orchestrator.orchestrate("plan it", &intent(), &context, &agents).await;

        assert!(response.orchestration_failed());
        assert_eq!(response.content, ORCHESTRATION_FAILED_MESSAGE);
        assert_eq!(response.orchestration().expect("summary").steps_completed, 1);
        assert_eq!(executor.calls(), vec![1, 2]);
    }

    #[tokio::test]
    async fn parallel_runs_every_step() {
        let executor = Arc::new(ScriptedExecutor::default());
        let orchestrator = orchestrator(executor.clone(), OrchestrationConfig::default());
        let agents = [agent("a", "Alpha"), agent("b", "Beta"), agent("c", "Gamma")];

        let response = orchestrator
            .orchestrate_with(
                "plan it",
                &intent(),
                &TurnContext::new("corr-2"),
                &agents,
                ExecutionStrategy::Parallel,
            )
            .await;

        let summary = response.orchestration().expect("summary");
        assert!(summary.success);
        assert_eq!(summary.strategy, ExecutionStrategy::Parallel);
        assert_eq!(summary.steps_completed, 3);
        assert!(response.content.starts_with("I've coordinated with Alpha, Beta, Gamma"));
    }

    #[tokio::test]
    async fn parallel_waits_for_slow_siblings_of_a_failed_step() {
        let executor = Arc::new(ScriptedExecutor {
            failing: BTreeSet::from(["a".to_owned()]),
            slow: BTreeSet::from(["a".to_owned(), "b".to_owned(), "c".to_owned()]),
            ..ScriptedExecutor::default()
        });
        let orchestrator = orchestrator(executor.clone(), OrchestrationConfig::default());
        let agents = [agent("a", "Alpha"), agent("b", "Beta"), agent("c", "Gamma")];
        let plan = orchestrator.create_plan(&intent(), &agents, ExecutionStrategy::Parallel);

        let started = std::time::Instant::now();
        let result = orchestrator
            .execute_plan(&plan, "plan it", &intent(), &TurnContext::new("corr-3"))
            .await
            .expect("valid plan");
        let elapsed = started.elapsed();

        assert!(!result.success);
        let numbers: Vec<u32> = result.steps.iter().map(|step| step.step_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(result.steps[0].error.as_deref(), Some("Alpha is offline"));
        assert!(result.steps[1].success && result.steps[2].success);
        assert_eq!(result.successful_steps(), 2);
        assert!(elapsed < Duration::from_millis(600), "steps ran serially: {elapsed:?}");

        let response = orchestrator
            .orchestrate_with(
                "plan it",
                &intent(),
                &TurnContext::new("corr-3"),
                &agents,
                ExecutionStrategy::Parallel,
            )
            .await;
        assert!(response.orchestration_failed());
        assert_eq!(response.orchestration().expect("summary").steps_completed, 2);
    }

    #[tokio::test]
    async fn hybrid_respects_dependency_levels() {
        let executor = Arc::new(ScriptedExecutor::default());
        let orchestrator = orchestrator(executor.clone(), OrchestrationConfig::default());
        let step = |number: u32, id: &str, deps: &[u32]| OrchestrationStep {
            step_number: number,
            agent: agent(id, &id.to_uppercase()),
            action: format!("step {number}"),
            dependencies: deps.iter().copied().collect(),
            expected_output: String::new(),
        };
        let plan = OrchestrationPlan {
            steps: vec![step(3, "c", &[1, 2]), step(1, "a", &[]), step(2, "b", &[])],
            strategy: ExecutionStrategy::Hybrid,
            estimated_time: Duration::ZERO,
        };

        let result = orchestrator
            .execute_plan(&plan, "plan it", &intent(), &TurnContext::new("corr-3"))
            .await
            .expect("valid plan");

        assert!(result.success);
        let order: Vec<u32> = result.steps.iter().map(|step| step.step_number).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(executor.calls().last(), Some(&3));
    }

    #[tokio::test]
    async fn cyclic_plan_yields_failed_orchestration() {
        let executor = Arc::new(ScriptedExecutor::default());
        let orchestrator = orchestrator(executor.clone(), OrchestrationConfig::default());
        let step = |number: u32, deps: &[u32]| OrchestrationStep {
            step_number: number,
            agent: agent("a", "Alpha"),
            action: String::new(),
            dependencies: deps.iter().copied().collect(),
            expected_output: String::new(),
        };
        let plan = OrchestrationPlan {
            steps: vec![step(1, &[2]), step(2, &[1])],
            strategy: ExecutionStrategy::Hybrid,
            estimated_time: Duration::ZERO,
        };

        let response =
            orchestrator.run_plan(&plan, "plan it", &intent(), &TurnContext::new("corr-4")).await;

        assert!(response.orchestration_failed());
        assert!(response.error().is_some());
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn slow_step_times_out() {
        let executor = Arc::new(ScriptedExecutor::slow(&["b"]));
        let config = OrchestrationConfig { step_timeout_ms: 20, ..OrchestrationConfig::default() };
        let orchestrator = orchestrator(executor, config);
        let plan = orchestrator.create_plan(
            &intent(),
            &[agent("a", "Alpha"), agent("b", "Beta")],
            ExecutionStrategy::Sequential,
        );

        let result = orchestrator
            .execute_plan(&plan, "plan it", &intent(), &TurnContext::new("corr-5"))
            .await
            .expect("valid plan");

        assert!(!result.success);
        assert!(result.steps[0].success);
        assert_eq!(result.steps[1].error.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn completion_is_audited() {
        let audit = InMemoryAuditSink::default();
        let orchestrator =
            orchestrator(Arc::new(ScriptedExecutor::default()), OrchestrationConfig::default())
                .with_audit_sink(Arc::new(audit.clone()));

        orchestrator
            .orchestrate(
                "plan it",
                &intent(),
                &TurnContext::for_session("corr-6", "s-6"),
                &[agent("a", "Alpha")],
            )
            .await;

        let events = audit.events_of_type("orchestration.completed");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].session_id.as_deref(), Some("s-6"));
        assert_eq!(events[0].metadata.get("agents").map(String::as_str), Some("Alpha"));
    }

    #[tokio::test]
    async fn handoff_wraps_protocol_result() {
        let orchestrator =
            orchestrator(Arc::new(ScriptedExecutor::default()), OrchestrationConfig::default());
        let sales = agent("sales-agent", "Sales");
        let support = agent("customer-service-agent", "Customer Service");
        let context =
            ConversationContext::new("s1").with_message(ConversationMessage::user("refund?"));

        let response = orchestrator
            .handoff(&sales, &support, context.clone(), "refund request", HandoffOptions::default())
            .await;
        assert!(response.is_handoff());
        match response.outcome() {
            Some(ResponseOutcome::HandoffInitiated { from_agent_id, to_agent_id, .. }) => {
                assert_eq!(from_agent_id.as_str(), "sales-agent");
                assert_eq!(to_agent_id.as_str(), "customer-service-agent");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let rejected = orchestrator
            .handoff(&sales, &sales, context, "loop", HandoffOptions::default())
            .await;
        assert!(rejected.handoff_failed());
        assert_eq!(rejected.error(), Some("Cannot handoff to the same agent"));
    }
}
