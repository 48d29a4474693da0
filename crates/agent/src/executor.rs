use async_trait::async_trait;
use tracing::debug;

use switchboard_core::domain::agent::Agent;
use switchboard_core::errors::StepExecutionError;
use switchboard_core::orchestration::{AgentExecutor, StepTask};

/// Default executor: acknowledges each step without generating content.
/// Content generation belongs to whatever replaces this executor.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcknowledgingExecutor;

#[async_trait]
impl AgentExecutor for AcknowledgingExecutor {
    async fn execute(
        &self,
        agent: &Agent,
        task: StepTask<'_>,
    ) -> Result<String, StepExecutionError> {
        if !agent.metadata.is_active() {
            return Err(StepExecutionError::Agent(format!("{} is not available", agent.name())));
        }

        debug!(
            event_name = "agent.step_acknowledged",
            correlation_id = %task.context.correlation_id,
            agent_id = %agent.id(),
            step_number = task.step_number,
            action = task.action,
            "agent acknowledged step"
        );
        Ok(format!("{} completed successfully", agent.name()))
    }
}
