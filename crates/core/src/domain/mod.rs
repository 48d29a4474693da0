pub mod agent;
pub mod conversation;
pub mod handoff;
pub mod intent;
pub mod orchestration;
pub mod response;
pub mod routing;
