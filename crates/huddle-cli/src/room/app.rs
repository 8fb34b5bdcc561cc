use crossterm::event::KeyCode;
use huddle_core::{
    Message, MentionAutocomplete, MentionIndex, MentionKey, MessageId, ParticipantInfo, SenderType,
};

use super::types::Notice;

// ── app state ────────────────────────────────────────────────────────────────

pub(super) struct App {
    pub(super) input: String,
    pub(super) cursor: usize,
    pub(super) scroll: u16,
    pub(super) auto_scroll: bool,
    pub(super) spin_i: usize,
    pub(super) notices: Vec<Notice>,
    pub(super) mentions: MentionIndex,
    pub(super) autocomplete: MentionAutocomplete,
    /// Staff member that Enter sends to.
    pub(super) responder: Option<i64>,
    /// Persisted message the input line is rewriting, if any.
    pub(super) editing: Option<i64>,
}

impl App {
    pub(super) fn new() -> Self {
        Self {
            input: String::new(),
            cursor: 0,
            scroll: u16::MAX,
            auto_scroll: true,
            spin_i: 0,
            notices: Vec::new(),
            mentions: MentionIndex::default(),
            autocomplete: MentionAutocomplete::new(),
            responder: None,
            editing: None,
        }
    }

    pub(super) fn notice(&mut self, notice: Notice) {
        self.notices.push(notice);
        if self.auto_scroll {
            self.scroll = u16::MAX;
        }
    }

    pub(super) fn insert_char(&mut self, c: char) {
        self.input.insert(self.cursor, c);
        self.cursor += c.len_utf8();
        self.refresh_autocomplete();
    }

    pub(super) fn backspace(&mut self) {
        if self.cursor > 0 {
            let i = self.input[..self.cursor]
                .char_indices()
                .last()
                .map(|(i, _)| i)
                .unwrap_or(0);
            self.input.drain(i..self.cursor);
            self.cursor = i;
        }
        self.refresh_autocomplete();
    }

    pub(super) fn cursor_left(&mut self) {
        if self.cursor > 0 {
            self.cursor = self.input[..self.cursor]
                .char_indices()
                .last()
                .map(|(i, _)| i)
                .unwrap_or(0);
        }
        self.refresh_autocomplete();
    }

    pub(super) fn cursor_right(&mut self) {
        if self.cursor < self.input.len() {
            let n = self.input[self.cursor..]
                .chars()
                .next()
                .map(|c| c.len_utf8())
                .unwrap_or(0);
            self.cursor += n;
        }
        self.refresh_autocomplete();
    }

    /// Take the input line for sending, leaving it empty.
    pub(super) fn take_input(&mut self) -> String {
        self.cursor = 0;
        self.autocomplete.dismiss();
        self.auto_scroll = true;
        self.scroll = u16::MAX;
        std::mem::take(&mut self.input)
    }

    /// Load `content` into the input line for rewriting message `id`.
    pub(super) fn begin_edit(&mut self, id: i64, content: &str) {
        self.input = content.to_string();
        self.cursor = self.input.len();
        self.editing = Some(id);
        self.refresh_autocomplete();
    }

    /// Drop an edit in progress. Returns false if there was none.
    pub(super) fn cancel_edit(&mut self) -> bool {
        if self.editing.take().is_none() {
            return false;
        }
        self.input.clear();
        self.cursor = 0;
        self.autocomplete.dismiss();
        true
    }

    pub(super) fn refresh_autocomplete(&mut self) {
        self.autocomplete
            .update(&self.input, self.cursor, &self.mentions);
    }

    pub(super) fn set_mentions(&mut self, index: MentionIndex) {
        self.mentions = index;
        if self.autocomplete.is_open() {
            self.refresh_autocomplete();
        }
    }

    /// Move the responder to the next participant, wrapping around.
    pub(super) fn cycle_responder(&mut self, participants: &[ParticipantInfo]) {
        if participants.is_empty() {
            self.responder = None;
            return;
        }
        let next = self
            .responder
            .and_then(|id| participants.iter().position(|p| p.staff_id == id))
            .map(|i| (i + 1) % participants.len())
            .unwrap_or(0);
        self.responder = Some(participants[next].staff_id);
    }
}

/// Keys the mention popup gets to see first.
pub(super) fn mention_key(code: KeyCode) -> Option<MentionKey> {
    match code {
        KeyCode::Up => Some(MentionKey::Up),
        KeyCode::Down => Some(MentionKey::Down),
        KeyCode::Enter => Some(MentionKey::Enter),
        KeyCode::Tab => Some(MentionKey::Tab),
        KeyCode::Esc => Some(MentionKey::Escape),
        _ => None,
    }
}

/// Database id of the newest persisted user message.
pub(super) fn last_user_message(messages: &[Message]) -> Option<i64> {
    messages
        .iter()
        .rev()
        .filter(|m| m.sender_type == SenderType::User)
        .find_map(|m| match m.id {
            MessageId::Persisted(id) => Some(id),
            MessageId::Local(_) => None,
        })
}
