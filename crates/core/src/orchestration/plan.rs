use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::agent::Agent;
use crate::domain::intent::Intent;
use crate::domain::orchestration::{ExecutionStrategy, OrchestrationPlan, OrchestrationStep};
use crate::errors::PlanValidationError;

/// One step per agent in the given order, each depending on the one before.
pub fn build_plan(
    intent: &Intent,
    agents: &[Arc<Agent>],
    strategy: ExecutionStrategy,
    estimated_step: Duration,
) -> OrchestrationPlan {
    let steps: Vec<OrchestrationStep> = agents
        .iter()
        .zip(1u32..)
        .map(|(agent, step_number)| OrchestrationStep {
            step_number,
            agent: Arc::clone(agent),
            action: format!("Process {} with {}", intent.intent_type, agent.name()),
            dependencies: if step_number > 1 {
                BTreeSet::from([step_number - 1])
            } else {
                BTreeSet::new()
            },
            expected_output: format!("{} contribution", agent.name()),
        })
        .collect();

    let estimated_time = estimated_step.saturating_mul(steps.len() as u32);
    OrchestrationPlan { steps, strategy, estimated_time }
}

/// Groups step numbers into dependency levels. Every step in a level only
/// depends on steps from earlier levels, so a level may run concurrently.
pub fn dependency_levels(plan: &OrchestrationPlan) -> Result<Vec<Vec<u32>>, PlanValidationError> {
    let mut indegree: BTreeMap<u32, usize> = BTreeMap::new();
    for step in &plan.steps {
        if indegree.insert(step.step_number, step.dependencies.len()).is_some() {
            return Err(PlanValidationError::DuplicateStep(step.step_number));
        }
    }

    let mut dependents: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
    for step in &plan.steps {
        for dependency in &step.dependencies {
            if *dependency == step.step_number {
                return Err(PlanValidationError::SelfDependency(step.step_number));
            }
            if !indegree.contains_key(dependency) {
                return Err(PlanValidationError::UnknownDependency {
                    step: step.step_number,
                    dependency: *dependency,
                });
            }
            dependents.entry(*dependency).or_default().push(step.step_number);
        }
    }

    let mut levels = Vec::new();
    let mut ready: Vec<u32> =
        indegree.iter().filter(|(_, degree)| **degree == 0).map(|(step, _)| *step).collect();
    let mut placed = 0usize;

    while !ready.is_empty() {
        let mut next = Vec::new();
        for step in &ready {
            for dependent in dependents.get(step).into_iter().flatten() {
                if let Some(degree) = indegree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        next.push(*dependent);
                    }
                }
            }
        }
        placed += ready.len();
        next.sort_unstable();
        levels.push(std::mem::replace(&mut ready, next));
    }

    if placed < plan.steps.len() {
        let blocked: Vec<u32> =
            indegree.into_iter().filter(|(_, degree)| *degree > 0).map(|(step, _)| step).collect();
        return Err(PlanValidationError::CyclicDependency(blocked));
    }

    Ok(levels)
}
