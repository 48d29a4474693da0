use thiserror::Error;

/// Reasons a handoff request is rejected before anything is persisted.
/// Display strings are shown to callers verbatim.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HandoffValidationError {
    #[error("Both fromAgentId and toAgentId are required")]
    MissingAgentId,
    #[error("Cannot handoff to the same agent")]
    SameAgent,
    #[error("Conversation context with sessionId is required")]
    MissingSessionId,
    #[error("Handoff reason is required")]
    MissingReason,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PlanValidationError {
    #[error("step {step} depends on unknown step {dependency}")]
    UnknownDependency { step: u32, dependency: u32 },
    #[error("step {0} depends on itself")]
    SelfDependency(u32),
    #[error("duplicate step number {0}")]
    DuplicateStep(u32),
    #[error("cyclic dependency between steps {0:?}")]
    CyclicDependency(Vec<u32>),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StepExecutionError {
    #[error("{0}")]
    Agent(String),
    #[error("timeout")]
    Timeout,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("handoff store unavailable: {0}")]
    Unavailable(String),
    #[error("could not encode handoff record: {0}")]
    Encode(String),
    #[error("could not decode handoff record: {0}")]
    Decode(String),
}
