use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::api::types::MeetingMessageRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    User,
    Staff,
}

/// Identity of a message in the store. Rows loaded from the backend keep
/// their database id; messages created by this client get a fresh uuid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Persisted(i64),
    Local(Uuid),
}

impl MessageId {
    pub fn local() -> Self {
        MessageId::Local(Uuid::new_v4())
    }

    pub fn persisted(&self) -> Option<i64> {
        match self {
            MessageId::Persisted(id) => Some(*id),
            MessageId::Local(_) => None,
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Persisted(id) => write!(f, "{id}"),
            MessageId::Local(id) => write!(f, "local-{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub meeting_id: i64,
    pub sender_type: SenderType,
    pub sender_name: String,
    pub staff_id: Option<i64>,
    pub content: String,
    pub created_at: NaiveDateTime,
    /// Set on a placeholder until its first chunk arrives.
    #[serde(default)]
    pub is_thinking: bool,
    /// Set while chunks are still arriving.
    #[serde(default)]
    pub is_streaming: bool,
}

impl Message {
    pub fn user(meeting_id: i64, sender_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::local(),
            meeting_id,
            sender_type: SenderType::User,
            sender_name: sender_name.into(),
            staff_id: None,
            content: content.into(),
            created_at: Utc::now().naive_utc(),
            is_thinking: false,
            is_streaming: false,
        }
    }

    /// Empty staff message shown while waiting for the first chunk.
    pub fn thinking(meeting_id: i64, staff_id: i64, staff_name: impl Into<String>) -> Self {
        Self {
            id: MessageId::local(),
            meeting_id,
            sender_type: SenderType::Staff,
            sender_name: staff_name.into(),
            staff_id: Some(staff_id),
            content: String::new(),
            created_at: Utc::now().naive_utc(),
            is_thinking: true,
            is_streaming: false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.is_thinking || self.is_streaming
    }
}

impl From<MeetingMessageRecord> for Message {
    fn from(r: MeetingMessageRecord) -> Self {
        Self {
            id: MessageId::Persisted(r.id),
            meeting_id: r.meeting_id,
            sender_type: r.sender_type,
            sender_name: r.sender_name,
            staff_id: r.staff_id,
            content: r.content,
            created_at: r.created_at,
            is_thinking: false,
            is_streaming: false,
        }
    }
}
