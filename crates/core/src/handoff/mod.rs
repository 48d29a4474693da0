pub mod message;
pub mod protocol;
pub mod store;

pub use message::SpecialtyTable;
pub use protocol::HandoffProtocol;
pub use store::{HandoffStore, InMemoryHandoffStore};
