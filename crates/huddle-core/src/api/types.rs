use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::chat::message::SenderType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub staff_id: i64,
    pub staff_name: String,
    #[serde(default)]
    pub staff_role: String,
    #[serde(default)]
    pub llm_provider: Option<String>,
    #[serde(default)]
    pub llm_model: Option<String>,
    #[serde(default)]
    pub joined_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingRecord {
    pub id: i64,
    pub company_id: i64,
    pub title: String,
    #[serde(default)]
    pub meeting_type: String,
    pub status: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub ended_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub participants: Vec<ParticipantInfo>,
}

impl MeetingRecord {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingMessageRecord {
    pub id: i64,
    pub meeting_id: i64,
    pub staff_id: Option<i64>,
    pub sender_type: SenderType,
    pub sender_name: String,
    pub content: String,
    pub created_at: NaiveDateTime,
}

/// An image attached to a meeting. `display_order` is the number users type
/// after `@img`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingImage {
    pub id: i64,
    /// Server-relative path, e.g. `/uploads/meetings/3/a.png`.
    pub image_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub display_order: Option<i64>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Image,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyAsset {
    pub id: i64,
    pub asset_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub asset_type: AssetType,
    pub file_path: String,
}

/// Body of the send endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    pub sender_name: String,
}

/// Body of the message edit endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateMessageRequest {
    pub content: String,
}
