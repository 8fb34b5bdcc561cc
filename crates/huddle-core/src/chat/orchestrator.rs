use futures_util::future::join_all;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::message::{Message, MessageId};
use super::store::MessageStore;
use crate::api::types::{
    MeetingRecord, ParticipantInfo, SendMessageRequest, UpdateMessageRequest,
};
use crate::api::MeetingApi;
use crate::config::HuddleConfig;
use crate::error::{ApiError, ChatError, Result};
use crate::stream::{StreamConsumer, StreamOutcome};

#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    Completed {
        placeholder: MessageId,
        content: String,
    },
    /// Stopped by the user. The message list has been reloaded.
    Cancelled,
}

#[derive(Debug)]
pub struct ParticipantOutcome {
    pub staff_id: i64,
    pub staff_name: String,
    pub placeholder: MessageId,
    pub result: Result<StreamOutcome>,
}

/// Per-participant results of an ask-all round, in participant order.
#[derive(Debug, Default)]
pub struct FanOutReport {
    pub outcomes: Vec<ParticipantOutcome>,
}

impl FanOutReport {
    pub fn completed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ParticipantOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

/// Clears the busy flag when the session ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            return Err(ChatError::Busy);
        }
        Ok(Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ChatOrchestratorBuilder {
    api: Arc<dyn MeetingApi>,
    meeting_id: i64,
    store: Option<Arc<MessageStore>>,
    sender_name: String,
    idle_timeout: Option<Duration>,
    participants: Vec<ParticipantInfo>,
}

impl ChatOrchestratorBuilder {
    pub fn new(api: Arc<dyn MeetingApi>, meeting_id: i64) -> Self {
        Self {
            api,
            meeting_id,
            store: None,
            sender_name: "User".to_string(),
            idle_timeout: None,
            participants: Vec::new(),
        }
    }

    /// Take the sender name and idle timeout from `config`.
    pub fn config(mut self, config: &HuddleConfig) -> Self {
        self.sender_name = config.sender_name.clone();
        self.idle_timeout = config.stream_idle_timeout();
        self
    }

    pub fn store(mut self, store: Arc<MessageStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = name.into();
        self
    }

    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Seed the participant list; `reload` replaces it.
    pub fn participants(mut self, participants: Vec<ParticipantInfo>) -> Self {
        self.participants = participants;
        self
    }

    pub fn build(self) -> Arc<ChatOrchestrator> {
        let (images_refresh, _) = watch::channel(0);
        Arc::new(ChatOrchestrator {
            api: self.api,
            store: self.store.unwrap_or_default(),
            meeting_id: self.meeting_id,
            sender_name: self.sender_name,
            idle_timeout: self.idle_timeout,
            meeting: RwLock::new(None),
            participants: RwLock::new(self.participants),
            busy: AtomicBool::new(false),
            solo_cancel: Mutex::new(None),
            images_refresh,
        })
    }
}

/// Runs chat sessions for one meeting against a shared message store.
///
/// At most one session is in flight at a time, whether it is a solo send,
/// a resend or an ask-all round.
pub struct ChatOrchestrator {
    api: Arc<dyn MeetingApi>,
    store: Arc<MessageStore>,
    meeting_id: i64,
    sender_name: String,
    idle_timeout: Option<Duration>,
    meeting: RwLock<Option<MeetingRecord>>,
    participants: RwLock<Vec<ParticipantInfo>>,
    busy: AtomicBool,
    solo_cancel: Mutex<Option<CancellationToken>>,
    images_refresh: watch::Sender<u64>,
}

impl ChatOrchestrator {
    pub fn meeting_id(&self) -> i64 {
        self.meeting_id
    }

    pub fn store(&self) -> &Arc<MessageStore> {
        &self.store
    }

    pub fn meeting(&self) -> Option<MeetingRecord> {
        self.meeting.read().clone()
    }

    pub fn participants(&self) -> Vec<ParticipantInfo> {
        self.participants.read().clone()
    }

    pub fn participant(&self, staff_id: i64) -> Option<ParticipantInfo> {
        self.participants
            .read()
            .iter()
            .find(|p| p.staff_id == staff_id)
            .cloned()
    }

    pub fn is_streaming(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Counter bumped whenever a reply may have produced new images.
    pub fn subscribe_images(&self) -> watch::Receiver<u64> {
        self.images_refresh.subscribe()
    }

    /// Fetch the meeting and its messages and replace local state.
    pub async fn reload(&self) -> Result<()> {
        let (meeting, records) = tokio::try_join!(
            self.api.get_meeting(self.meeting_id),
            self.api.list_messages(self.meeting_id),
        )?;
        info!(
            meeting_id = self.meeting_id,
            messages = records.len(),
            participants = meeting.participants.len(),
            "meeting loaded"
        );
        *self.participants.write() = meeting.participants.clone();
        *self.meeting.write() = Some(meeting);
        self.store
            .replace_all(records.into_iter().map(Message::from).collect());
        Ok(())
    }

    pub async fn reload_messages(&self) -> Result<()> {
        let records = self.api.list_messages(self.meeting_id).await?;
        self.store
            .replace_all(records.into_iter().map(Message::from).collect());
        Ok(())
    }

    /// Ask one staff member. The backend persists the user message.
    pub async fn send(&self, content: &str, responder: Option<i64>) -> Result<SendOutcome> {
        if content.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let staff_id = responder.ok_or(ChatError::NoResponder)?;
        let participant = self
            .participant(staff_id)
            .ok_or(ChatError::NotAParticipant(staff_id))?;
        let _guard = BusyGuard::acquire(&self.busy)?;

        self.store
            .append(Message::user(self.meeting_id, &self.sender_name, content));
        let placeholder = self.append_placeholder(&participant);
        info!(meeting_id = self.meeting_id, staff_id, "send started");

        let request = SendMessageRequest {
            content: content.to_string(),
            sender_name: self.sender_name.clone(),
        };
        let cancel = self.arm_cancel();
        let result = StreamConsumer::new(placeholder, cancel)
            .idle_timeout(self.idle_timeout)
            .run(
                self.api
                    .send_message(self.meeting_id, staff_id, &request, true),
                self.store.as_ref(),
            )
            .await;
        self.disarm_cancel();

        let outcome = self.finish_solo(placeholder, result).await?;
        if let SendOutcome::Completed { .. } = outcome {
            self.bump_images();
        }
        Ok(outcome)
    }

    /// Regenerate the reply to a persisted user message.
    ///
    /// The backend drops everything after `message_id` and stores the new
    /// reply, so the list is reloaded once the stream completes.
    pub async fn resend(&self, message_id: i64, responder: Option<i64>) -> Result<SendOutcome> {
        let staff_id = responder.ok_or(ChatError::NoResponder)?;
        let participant = self
            .participant(staff_id)
            .ok_or(ChatError::NotAParticipant(staff_id))?;
        let _guard = BusyGuard::acquire(&self.busy)?;

        let placeholder = self.append_placeholder(&participant);
        info!(meeting_id = self.meeting_id, message_id, staff_id, "resend started");

        let cancel = self.arm_cancel();
        let result = StreamConsumer::new(placeholder, cancel)
            .idle_timeout(self.idle_timeout)
            .run(
                self.api.resend_message(message_id, staff_id),
                self.store.as_ref(),
            )
            .await;
        self.disarm_cancel();

        let outcome = self.finish_solo(placeholder, result).await?;
        if let SendOutcome::Completed { .. } = outcome {
            if let Err(e) = self.reload_messages().await {
                warn!("reload after resend failed: {}", e);
            }
            self.bump_images();
        }
        Ok(outcome)
    }

    /// Put the same prompt to every participant at once.
    ///
    /// Only the first request persists the user message. A failing
    /// participant loses its placeholder; the others carry on.
    pub async fn ask_all(&self, content: &str) -> Result<FanOutReport> {
        if content.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let participants = self.participants();
        if participants.is_empty() {
            return Err(ChatError::NoParticipants);
        }
        let _guard = BusyGuard::acquire(&self.busy)?;

        self.store
            .append(Message::user(self.meeting_id, &self.sender_name, content));
        let sessions: Vec<(ParticipantInfo, MessageId)> = participants
            .into_iter()
            .map(|p| {
                let id = self.append_placeholder(&p);
                (p, id)
            })
            .collect();
        info!(
            meeting_id = self.meeting_id,
            participants = sessions.len(),
            "ask all started"
        );

        let request = SendMessageRequest {
            content: content.to_string(),
            sender_name: self.sender_name.clone(),
        };
        let runs = sessions.iter().enumerate().map(|(i, (p, placeholder))| {
            let request = &request;
            async move {
                // ask-all rounds cannot be stopped, so nothing else holds this token
                let result = StreamConsumer::new(*placeholder, CancellationToken::new())
                    .idle_timeout(self.idle_timeout)
                    .run(
                        self.api
                            .send_message(self.meeting_id, p.staff_id, request, i == 0),
                        self.store.as_ref(),
                    )
                    .await;
                if let Err(e) = &result {
                    warn!(
                        staff_id = p.staff_id,
                        staff = %p.staff_name,
                        "ask all participant failed: {}",
                        e
                    );
                    self.store.remove(*placeholder);
                }
                ParticipantOutcome {
                    staff_id: p.staff_id,
                    staff_name: p.staff_name.clone(),
                    placeholder: *placeholder,
                    result: result.map_err(ChatError::from),
                }
            }
        });
        let report = FanOutReport {
            outcomes: join_all(runs).await,
        };

        self.bump_images();
        info!(
            meeting_id = self.meeting_id,
            completed = report.completed(),
            failed = report.outcomes.len() - report.completed(),
            "ask all finished"
        );
        Ok(report)
    }

    /// Replace the text of a persisted message, then patch the local copy.
    ///
    /// Returns false without a request when the text is unchanged. Replies
    /// that followed the message are kept; a resend regenerates them.
    pub async fn edit(&self, message_id: i64, content: &str) -> Result<bool> {
        if content.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let id = MessageId::Persisted(message_id);
        if self.store.get(id).is_some_and(|m| m.content == content) {
            return Ok(false);
        }

        let request = UpdateMessageRequest {
            content: content.to_string(),
        };
        self.api.update_message(message_id, &request).await?;
        if !self.store.update(id, |m| m.content = request.content) {
            warn!(message_id, "edited message is not in the local list");
        }
        info!(meeting_id = self.meeting_id, message_id, "message edited");
        Ok(true)
    }

    /// Cancel the solo stream, if one is running.
    pub fn stop(&self) -> bool {
        match self.solo_cancel.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn append_placeholder(&self, participant: &ParticipantInfo) -> MessageId {
        let message = Message::thinking(self.meeting_id, participant.staff_id, &participant.staff_name);
        let id = message.id;
        self.store.append(message);
        id
    }

    fn arm_cancel(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.solo_cancel.lock() = Some(token.clone());
        token
    }

    fn disarm_cancel(&self) {
        self.solo_cancel.lock().take();
    }

    fn bump_images(&self) {
        self.images_refresh.send_modify(|n| *n += 1);
    }

    async fn finish_solo(
        &self,
        placeholder: MessageId,
        result: std::result::Result<StreamOutcome, ApiError>,
    ) -> Result<SendOutcome> {
        match result {
            Ok(StreamOutcome::Completed(content)) => {
                info!(%placeholder, chars = content.len(), "reply complete");
                Ok(SendOutcome::Completed {
                    placeholder,
                    content,
                })
            }
            Ok(StreamOutcome::Cancelled) => {
                info!(%placeholder, "reply stopped");
                // the backend may have saved a partial reply
                if let Err(e) = self.reload_messages().await {
                    warn!("reload after stop failed: {}", e);
                    self.store.remove(placeholder);
                }
                Ok(SendOutcome::Cancelled)
            }
            Err(e) => {
                error!(%placeholder, "reply failed: {}", e);
                self.store.remove(placeholder);
                Err(e.into())
            }
        }
    }
}
