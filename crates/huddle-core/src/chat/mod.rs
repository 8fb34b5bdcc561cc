pub mod message;
pub mod orchestrator;
pub mod store;

pub use message::{Message, MessageId, SenderType};
pub use orchestrator::{
    ChatOrchestrator, ChatOrchestratorBuilder, FanOutReport, ParticipantOutcome, SendOutcome,
};
pub use store::MessageStore;
