use huddle_core::{
    ApiError, ChatError, FanOutReport, Message, MentionIndex, ParticipantInfo, SendOutcome,
    SenderType,
};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

pub(super) const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

// ── notices ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub(super) enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub(super) fn to_lines(&self) -> Vec<Line<'static>> {
        match self {
            Notice::Info(t) => vec![
                Line::from(Span::styled(
                    format!("  {t}"),
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                )),
                Line::raw(""),
            ],
            Notice::Error(t) => vec![
                Line::from(vec![
                    Span::styled(" error ", Style::default().fg(Color::White).bg(Color::Red)),
                    Span::raw("  "),
                    Span::styled(t.clone(), Style::default().fg(Color::Red)),
                ]),
                Line::raw(""),
            ],
        }
    }
}

// ── message bubbles ──────────────────────────────────────────────────────────

pub(super) fn message_lines(msg: &Message, spin_i: usize) -> Vec<Line<'static>> {
    match msg.sender_type {
        SenderType::User => vec![
            Line::from(vec![
                Span::styled(
                    format!(" {} ", msg.sender_name),
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::styled(msg.content.clone(), Style::default().fg(Color::Cyan)),
            ]),
            Line::raw(""),
        ],
        SenderType::Staff => {
            let mut lines = vec![Line::from(Span::styled(
                format!(" {} ", msg.sender_name),
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ))];
            if msg.is_thinking {
                lines.push(Line::from(Span::styled(
                    format!("  {} thinking…", SPINNER[spin_i % SPINNER.len()]),
                    Style::default().fg(Color::Cyan),
                )));
            } else {
                for l in msg.content.lines() {
                    lines.push(Line::from(Span::styled(
                        format!("  {l}"),
                        Style::default().fg(Color::White),
                    )));
                }
                if msg.is_streaming {
                    lines.push(Line::from(Span::styled(
                        "  ▌",
                        Style::default().fg(Color::Green),
                    )));
                }
            }
            lines.push(Line::raw(""));
            lines
        }
    }
}

// ── per-frame snapshot of the orchestrator ───────────────────────────────────

pub(super) struct RoomView {
    pub(super) title: String,
    pub(super) status: String,
    pub(super) participants: Vec<ParticipantInfo>,
    pub(super) messages: Vec<Message>,
    pub(super) streaming: bool,
}

// ── events from background tasks ─────────────────────────────────────────────

pub(super) enum DisplayEvent {
    Sent(Result<SendOutcome, ChatError>),
    Resent(Result<SendOutcome, ChatError>),
    AskedAll(Result<FanOutReport, ChatError>),
    /// `Ok(false)` when the text was unchanged.
    Edited(Result<bool, ChatError>),
    Mentions(Result<MentionIndex, ApiError>),
}
