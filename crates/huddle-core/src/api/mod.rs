#[allow(clippy::module_inception)]
pub mod api;
#[cfg(test)]
pub(crate) mod fake;
pub mod http;
pub mod types;

pub use api::{ByteStream, MeetingApi};
pub use http::HttpMeetingApi;
pub use types::{
    AssetType, CompanyAsset, MeetingImage, MeetingMessageRecord, MeetingRecord, ParticipantInfo,
    SendMessageRequest, UpdateMessageRequest,
};
