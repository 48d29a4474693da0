use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::agent::{Agent, AgentId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    #[default]
    Sequential,
    Parallel,
    Hybrid,
}

impl ExecutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
            Self::Hybrid => "hybrid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sequential" => Some(Self::Sequential),
            "parallel" => Some(Self::Parallel),
            "hybrid" => Some(Self::Hybrid),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct OrchestrationStep {
    pub step_number: u32,
    pub agent: Arc<Agent>,
    pub action: String,
    pub dependencies: BTreeSet<u32>,
    pub expected_output: String,
}

#[derive(Clone, Debug)]
pub struct OrchestrationPlan {
    pub steps: Vec<OrchestrationStep>,
    pub strategy: ExecutionStrategy,
    pub estimated_time: Duration,
}

impl OrchestrationPlan {
    pub fn agent_names(&self) -> Vec<String> {
        self.steps.iter().map(|step| step.agent.name().to_owned()).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_number: u32,
    pub agent_id: AgentId,
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,
    pub elapsed: Duration,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub success: bool,
    pub steps: Vec<StepResult>,
    pub total_time: Duration,
}

impl OrchestrationResult {
    /// Success is the conjunction over every step; an empty plan succeeds.
    pub fn from_steps(mut steps: Vec<StepResult>, total_time: Duration) -> Self {
        steps.sort_by_key(|step| step.step_number);
        let success = steps.iter().all(|step| step.success);
        Self { success, steps, total_time }
    }

    pub fn successful_steps(&self) -> usize {
        self.steps.iter().filter(|step| step.success).count()
    }
}

/// Orchestration details attached to every orchestrated response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationSummary {
    pub success: bool,
    pub strategy: ExecutionStrategy,
    pub agents_involved: Vec<String>,
    pub steps_completed: usize,
    pub total_steps: usize,
    pub elapsed_ms: u64,
    pub error: Option<String>,
}
