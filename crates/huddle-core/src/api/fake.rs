//! Scripted in-memory backend for orchestrator and index tests.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDateTime;
use futures_util::stream;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

use super::api::{ByteStream, MeetingApi};
use super::types::{
    CompanyAsset, MeetingImage, MeetingMessageRecord, MeetingRecord, ParticipantInfo,
    SendMessageRequest, UpdateMessageRequest,
};
use crate::error::ApiError;

/// How the fake answers a streaming request for one staff member.
pub(crate) enum Script {
    Chunks(Vec<&'static str>),
    /// Reject the request with this HTTP status.
    Reject(u16),
    /// Deliver these chunks, then fail mid-stream.
    BreakAfter(Vec<&'static str>),
    /// Forward whatever the test pushes into the channel.
    Channel(mpsc::UnboundedReceiver<Result<Bytes, ApiError>>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StreamCall {
    pub staff_id: i64,
    pub content: Option<String>,
    pub save_user_message: Option<bool>,
    pub resend_of: Option<i64>,
}

pub(crate) struct FakeApi {
    pub meeting: Mutex<MeetingRecord>,
    pub messages: Mutex<Vec<MeetingMessageRecord>>,
    pub images: Mutex<Vec<MeetingImage>>,
    pub assets: Mutex<Vec<CompanyAsset>>,
    pub calls: Mutex<Vec<StreamCall>>,
    pub asset_requests: Mutex<Vec<i64>>,
    /// `(message_id, content)` for every edit the fake accepted.
    pub edits: Mutex<Vec<(i64, String)>>,
    /// Fail `list_messages` with a 500 while set.
    pub fail_list: AtomicBool,
    /// Fail `update_message` with a 404 while set.
    pub fail_update: AtomicBool,
    scripts: Mutex<HashMap<i64, Script>>,
}

pub(crate) fn ts() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2024-05-01 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
}

pub(crate) fn participant(staff_id: i64, name: &str) -> ParticipantInfo {
    ParticipantInfo {
        staff_id,
        staff_name: name.to_string(),
        staff_role: "Engineer".to_string(),
        llm_provider: None,
        llm_model: None,
        joined_at: None,
    }
}

pub(crate) fn record(id: i64, staff_id: Option<i64>, content: &str) -> MeetingMessageRecord {
    MeetingMessageRecord {
        id,
        meeting_id: 3,
        staff_id,
        sender_type: if staff_id.is_some() {
            crate::chat::message::SenderType::Staff
        } else {
            crate::chat::message::SenderType::User
        },
        sender_name: if staff_id.is_some() { "Staff" } else { "User" }.to_string(),
        content: content.to_string(),
        created_at: ts(),
    }
}

impl FakeApi {
    pub fn new(participants: Vec<ParticipantInfo>) -> Self {
        Self {
            meeting: Mutex::new(MeetingRecord {
                id: 3,
                company_id: 1,
                title: "Launch review".to_string(),
                meeting_type: "general".to_string(),
                status: "active".to_string(),
                summary: None,
                created_at: ts(),
                ended_at: None,
                participants,
            }),
            messages: Mutex::new(Vec::new()),
            images: Mutex::new(Vec::new()),
            assets: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            asset_requests: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            fail_list: AtomicBool::new(false),
            fail_update: AtomicBool::new(false),
            scripts: Mutex::new(HashMap::new()),
        }
    }

    pub fn script(&self, staff_id: i64, script: Script) {
        self.scripts.lock().insert(staff_id, script);
    }

    fn play(&self, staff_id: i64) -> Result<ByteStream, ApiError> {
        let script = self
            .scripts
            .lock()
            .remove(&staff_id)
            .unwrap_or(Script::Chunks(vec!["ok"]));
        match script {
            Script::Chunks(chunks) => Ok(Box::pin(stream::iter(
                chunks
                    .into_iter()
                    .map(|c| Ok::<_, ApiError>(Bytes::from_static(c.as_bytes()))),
            ))),
            Script::Reject(status) => Err(ApiError::Status {
                status,
                body: "scripted failure".to_string(),
            }),
            Script::BreakAfter(chunks) => {
                let mut items: Vec<Result<Bytes, ApiError>> = chunks
                    .into_iter()
                    .map(|c| Ok(Bytes::from_static(c.as_bytes())))
                    .collect();
                items.push(Err(ApiError::Status {
                    status: 502,
                    body: "upstream closed".to_string(),
                }));
                Ok(Box::pin(stream::iter(items)))
            }
            Script::Channel(rx) => Ok(Box::pin(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            }))),
        }
    }
}

#[async_trait]
impl MeetingApi for FakeApi {
    async fn get_meeting(&self, _meeting_id: i64) -> Result<MeetingRecord, ApiError> {
        Ok(self.meeting.lock().clone())
    }

    async fn list_messages(&self, _meeting_id: i64) -> Result<Vec<MeetingMessageRecord>, ApiError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 500,
                body: "database unavailable".to_string(),
            });
        }
        Ok(self.messages.lock().clone())
    }

    async fn send_message(
        &self,
        _meeting_id: i64,
        staff_id: i64,
        request: &SendMessageRequest,
        save_user_message: bool,
    ) -> Result<ByteStream, ApiError> {
        self.calls.lock().push(StreamCall {
            staff_id,
            content: Some(request.content.clone()),
            save_user_message: Some(save_user_message),
            resend_of: None,
        });
        tokio::task::yield_now().await;
        self.play(staff_id)
    }

    async fn resend_message(&self, message_id: i64, staff_id: i64) -> Result<ByteStream, ApiError> {
        self.calls.lock().push(StreamCall {
            staff_id,
            content: None,
            save_user_message: None,
            resend_of: Some(message_id),
        });
        self.play(staff_id)
    }

    async fn update_message(
        &self,
        message_id: i64,
        request: &UpdateMessageRequest,
    ) -> Result<(), ApiError> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 404,
                body: "Message not found".to_string(),
            });
        }
        self.edits.lock().push((message_id, request.content.clone()));
        if let Some(m) = self.messages.lock().iter_mut().find(|m| m.id == message_id) {
            m.content = request.content.clone();
        }
        Ok(())
    }

    async fn list_images(&self, _meeting_id: i64) -> Result<Vec<MeetingImage>, ApiError> {
        Ok(self.images.lock().clone())
    }

    async fn list_assets(&self, company_id: i64) -> Result<Vec<CompanyAsset>, ApiError> {
        self.asset_requests.lock().push(company_id);
        Ok(self.assets.lock().clone())
    }
}
