use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use std::pin::Pin;

use super::types::{
    CompanyAsset, MeetingImage, MeetingMessageRecord, MeetingRecord, SendMessageRequest,
    UpdateMessageRequest,
};
use crate::error::ApiError;

/// Raw body of a streamed staff reply.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ApiError>> + Send>>;

/// The meeting backend as seen by the chat client.
#[async_trait]
pub trait MeetingApi: Send + Sync {
    async fn get_meeting(&self, meeting_id: i64) -> Result<MeetingRecord, ApiError>;

    async fn list_messages(&self, meeting_id: i64) -> Result<Vec<MeetingMessageRecord>, ApiError>;

    /// Post a prompt to one staff member and stream the reply. When
    /// `save_user_message` is false the backend answers without storing the
    /// prompt.
    async fn send_message(
        &self,
        meeting_id: i64,
        staff_id: i64,
        request: &SendMessageRequest,
        save_user_message: bool,
    ) -> Result<ByteStream, ApiError>;

    /// Regenerate the reply to an existing message. The backend discards
    /// everything after it.
    async fn resend_message(&self, message_id: i64, staff_id: i64) -> Result<ByteStream, ApiError>;

    /// Replace the text of a stored message. Later replies are left alone.
    async fn update_message(
        &self,
        message_id: i64,
        request: &UpdateMessageRequest,
    ) -> Result<(), ApiError>;

    async fn list_images(&self, meeting_id: i64) -> Result<Vec<MeetingImage>, ApiError>;

    async fn list_assets(&self, company_id: i64) -> Result<Vec<CompanyAsset>, ApiError>;
}
