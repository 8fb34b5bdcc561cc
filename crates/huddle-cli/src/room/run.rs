use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use huddle_core::mention::resolve_mentions;
use huddle_core::{
    ChatOrchestrator, ChatOrchestratorBuilder, HttpMeetingApi, HuddleConfig, KeyOutcome,
    MeetingApi, MentionIndex, MessageId, SendOutcome,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::app::{last_user_message, mention_key, App};
use super::render::render;
use super::types::{DisplayEvent, Notice, RoomView};

struct Room {
    orch: Arc<ChatOrchestrator>,
    api: Arc<dyn MeetingApi>,
    asset_base_url: String,
    tx: mpsc::Sender<DisplayEvent>,
}

impl Room {
    fn view(&self) -> RoomView {
        let meeting = self.orch.meeting();
        RoomView {
            title: meeting
                .as_ref()
                .map(|m| m.title.clone())
                .unwrap_or_else(|| format!("meeting {}", self.orch.meeting_id())),
            status: meeting.map(|m| m.status).unwrap_or_default(),
            participants: self.orch.participants(),
            messages: self.orch.store().snapshot(),
            streaming: self.orch.is_streaming(),
        }
    }

    fn reload_mentions(&self) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        let meeting_id = self.orch.meeting_id();
        let company_id = self.orch.meeting().map(|m| m.company_id);
        let base = self.asset_base_url.clone();
        tokio::spawn(async move {
            let index = MentionIndex::load(api.as_ref(), meeting_id, company_id, &base).await;
            let _ = tx.send(DisplayEvent::Mentions(index)).await;
        });
    }

    fn send(&self, app: &mut App) {
        if app.input.trim().is_empty() {
            return;
        }
        if app.editing.is_some() {
            self.save_edit(app);
            return;
        }
        if self.orch.is_streaming() {
            app.notice(Notice::Info("wait for the current reply or stop it".into()));
            return;
        }
        let text = app.take_input();
        warn_missing_mentions(app, &text);

        let orch = Arc::clone(&self.orch);
        let tx = self.tx.clone();
        let responder = app.responder;
        tokio::spawn(async move {
            let result = orch.send(&text, responder).await;
            let _ = tx.send(DisplayEvent::Sent(result)).await;
        });
    }

    fn ask_all(&self, app: &mut App) {
        if app.input.trim().is_empty() {
            return;
        }
        if self.orch.is_streaming() {
            app.notice(Notice::Info("wait for the current reply or stop it".into()));
            return;
        }
        let text = app.take_input();
        warn_missing_mentions(app, &text);

        let orch = Arc::clone(&self.orch);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = orch.ask_all(&text).await;
            let _ = tx.send(DisplayEvent::AskedAll(result)).await;
        });
    }

    fn resend(&self, app: &mut App) {
        if self.orch.is_streaming() {
            return;
        }
        let Some(message_id) = last_user_message(&self.orch.store().snapshot()) else {
            app.notice(Notice::Info("nothing to resend yet".into()));
            return;
        };
        let orch = Arc::clone(&self.orch);
        let tx = self.tx.clone();
        let responder = app.responder;
        tokio::spawn(async move {
            let result = orch.resend(message_id, responder).await;
            let _ = tx.send(DisplayEvent::Resent(result)).await;
        });
    }

    fn begin_edit(&self, app: &mut App) {
        let Some(message_id) = last_user_message(&self.orch.store().snapshot()) else {
            app.notice(Notice::Info("nothing to edit yet".into()));
            return;
        };
        if let Some(message) = self.orch.store().get(MessageId::Persisted(message_id)) {
            app.begin_edit(message_id, &message.content);
        }
    }

    fn save_edit(&self, app: &mut App) {
        let Some(message_id) = app.editing.take() else {
            return;
        };
        let text = app.take_input();
        let orch = Arc::clone(&self.orch);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = orch.edit(message_id, &text).await;
            let _ = tx.send(DisplayEvent::Edited(result)).await;
        });
    }

    fn stop(&self, app: &mut App) {
        if self.orch.stop() {
            info!("stop requested");
        } else if self.orch.is_streaming() {
            app.notice(Notice::Info("ask-all replies cannot be stopped".into()));
        }
    }
}

/// Mentions are sent as typed; unknown ones only get a notice.
fn warn_missing_mentions(app: &mut App, text: &str) {
    let resolved = resolve_mentions(text, &app.mentions);
    if resolved.has_missing() {
        app.notice(Notice::Info(format!(
            "unknown mentions: {}",
            resolved.missing.join(", ")
        )));
    }
}

fn handle_event(app: &mut App, ev: DisplayEvent) {
    match ev {
        DisplayEvent::Sent(Ok(SendOutcome::Cancelled)) => app.notice(Notice::Info("stopped".into())),
        DisplayEvent::Sent(Ok(SendOutcome::Completed { .. })) => {}
        DisplayEvent::Sent(Err(e)) => app.notice(Notice::Error(e.to_string())),
        DisplayEvent::Resent(Ok(SendOutcome::Cancelled)) => {
            app.notice(Notice::Info("resend stopped".into()))
        }
        DisplayEvent::Resent(Ok(SendOutcome::Completed { .. })) => {}
        DisplayEvent::Resent(Err(e)) => app.notice(Notice::Error(format!("resend failed: {e}"))),
        DisplayEvent::AskedAll(Ok(report)) => {
            for failure in report.failures() {
                if let Err(e) = &failure.result {
                    app.notice(Notice::Error(format!("{}: {}", failure.staff_name, e)));
                }
            }
        }
        DisplayEvent::AskedAll(Err(e)) => app.notice(Notice::Error(e.to_string())),
        DisplayEvent::Edited(Ok(true)) => {
            app.notice(Notice::Info("message updated; ^R to resend".into()))
        }
        DisplayEvent::Edited(Ok(false)) => {}
        DisplayEvent::Edited(Err(e)) => app.notice(Notice::Error(format!("edit failed: {e}"))),
        DisplayEvent::Mentions(Ok(index)) => {
            info!(mentions = index.len(), "mention index loaded");
            app.set_mentions(index);
        }
        DisplayEvent::Mentions(Err(e)) => {
            warn!("mention index reload failed: {}", e);
        }
    }
}

// ── main entry ───────────────────────────────────────────────────────────────

pub async fn run(config: HuddleConfig, meeting_id: i64, staff_id: Option<i64>) -> Result<()> {
    let api: Arc<dyn MeetingApi> = Arc::new(HttpMeetingApi::from_config(&config)?);
    let orch = ChatOrchestratorBuilder::new(Arc::clone(&api), meeting_id)
        .config(&config)
        .build();
    orch.reload()
        .await
        .with_context(|| format!("loading meeting {meeting_id}"))?;

    let (tx, mut rx) = mpsc::channel::<DisplayEvent>(64);
    let room = Room {
        orch: Arc::clone(&orch),
        api,
        asset_base_url: config.asset_base_url.clone(),
        tx,
    };

    let mut app = App::new();
    let participants = orch.participants();
    app.responder = match staff_id {
        Some(id) if participants.iter().any(|p| p.staff_id == id) => Some(id),
        Some(id) => {
            app.notice(Notice::Error(format!(
                "staff {id} is not in this meeting"
            )));
            participants.first().map(|p| p.staff_id)
        }
        None => participants.first().map(|p| p.staff_id),
    };
    if let Some(meeting) = orch.meeting() {
        if !meeting.is_active() {
            app.notice(Notice::Info(format!("meeting is {}", meeting.status)));
        }
    }
    room.reload_mentions();
    let mut images_rx = orch.subscribe_images();

    // Terminal setup. Restore the terminal on panic, otherwise the shell is
    // left in raw mode.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));

    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    terminal.clear()?;

    let (key_tx, mut key_rx) = mpsc::channel::<Event>(32);
    tokio::task::spawn_blocking(move || loop {
        if event::poll(Duration::from_millis(100)).unwrap_or(false) {
            if let Ok(ev) = event::read() {
                if key_tx.blocking_send(ev).is_err() {
                    break;
                }
            }
        }
    });

    'main: loop {
        let view = room.view();
        terminal.draw(|f| render(&mut app, &view, f))?;

        tokio::select! {
            // ── keyboard ──
            key = key_rx.recv() => {
                let Some(ev) = key else { break };
                let Event::Key(key) = ev else { continue 'main };
                if key.kind != KeyEventKind::Press { continue 'main; }
                let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

                if ctrl {
                    match key.code {
                        KeyCode::Char('c') => break 'main,
                        KeyCode::Char('x') => room.stop(&mut app),
                        KeyCode::Char('a') => room.ask_all(&mut app),
                        KeyCode::Char('s') => app.cycle_responder(&view.participants),
                        KeyCode::Char('r') => room.resend(&mut app),
                        KeyCode::Char('e') => room.begin_edit(&mut app),
                        _ => {}
                    }
                    continue 'main;
                }

                if let Some(mk) = mention_key(key.code) {
                    let outcome = app.autocomplete.handle_key(mk, &mut app.input, &mut app.cursor);
                    if outcome == KeyOutcome::Consumed {
                        continue 'main;
                    }
                }

                match key.code {
                    KeyCode::Enter => room.send(&mut app),
                    KeyCode::Esc => {
                        if !app.cancel_edit() {
                            room.stop(&mut app);
                        }
                    }
                    KeyCode::Up => {
                        app.auto_scroll = false;
                        app.scroll = app.scroll.saturating_sub(3);
                    }
                    KeyCode::Down => {
                        app.scroll = app.scroll.saturating_add(3);
                        if app.scroll == u16::MAX { app.auto_scroll = true; }
                    }
                    KeyCode::PageUp => {
                        app.auto_scroll = false;
                        app.scroll = app.scroll.saturating_sub(10);
                    }
                    KeyCode::PageDown => {
                        app.scroll = app.scroll.saturating_add(10);
                    }
                    KeyCode::End => {
                        app.auto_scroll = true;
                        app.scroll = u16::MAX;
                    }
                    KeyCode::Left => app.cursor_left(),
                    KeyCode::Right => app.cursor_right(),
                    KeyCode::Backspace => app.backspace(),
                    KeyCode::Char(c) => app.insert_char(c),
                    _ => {}
                }
            }

            // ── background results ──
            Some(ev) = rx.recv() => handle_event(&mut app, ev),

            // ── new images may exist ──
            Ok(()) = images_rx.changed() => room.reload_mentions(),

            // ── spinner tick ──
            _ = tokio::time::sleep(Duration::from_millis(80)) => {
                app.spin_i = app.spin_i.wrapping_add(1);
                if app.auto_scroll { app.scroll = u16::MAX; }
            }
        }
    }

    orch.stop();
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
    Ok(())
}
