pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod mention;
pub mod stream;

pub use api::{
    AssetType, ByteStream, CompanyAsset, HttpMeetingApi, MeetingApi, MeetingImage,
    MeetingMessageRecord, MeetingRecord, ParticipantInfo,
};
pub use chat::{
    ChatOrchestrator, ChatOrchestratorBuilder, FanOutReport, Message, MessageId, MessageStore,
    ParticipantOutcome, SendOutcome, SenderType,
};
pub use config::HuddleConfig;
pub use error::{ApiError, ChatError};
pub use mention::{
    KeyOutcome, Mention, MentionAutocomplete, MentionIndex, MentionKey, MentionKind,
    ResolvedMentions,
};
pub use stream::{MessageSink, MessageUpdate, StreamConsumer, StreamOutcome};
