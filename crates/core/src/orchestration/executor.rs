use async_trait::async_trait;

use crate::domain::agent::Agent;
use crate::domain::conversation::TurnContext;
use crate::domain::intent::Intent;
use crate::errors::StepExecutionError;

/// Everything an agent sees when it runs one plan step.
#[derive(Clone, Copy, Debug)]
pub struct StepTask<'a> {
    pub step_number: u32,
    pub action: &'a str,
    pub message: &'a str,
    pub intent: &'a Intent,
    pub context: &'a TurnContext,
}

/// Runs an agent for one step. The output text is opaque to orchestration.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn execute(
        &self,
        agent: &Agent,
        task: StepTask<'_>,
    ) -> Result<String, StepExecutionError>;
}
