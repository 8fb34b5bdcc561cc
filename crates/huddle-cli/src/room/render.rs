use huddle_core::MentionKind;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::app::App;
use super::types::{message_lines, RoomView};

const ACCENT: Color = Color::Rgb(255, 128, 0);
const POPUP_ROWS: usize = 8;

pub(super) fn render(app: &mut App, view: &RoomView, frame: &mut Frame) {
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // header
            Constraint::Min(1),    // messages
            Constraint::Length(3), // input
        ])
        .split(area);

    // ── header ────────────────────────────────────────────────────────────────
    let mut people: Vec<Span> = vec![Span::styled(
        "  staff   ",
        Style::default().fg(Color::DarkGray),
    )];
    if view.participants.is_empty() {
        people.push(Span::styled("none", Style::default().fg(Color::DarkGray)));
    }
    for p in &view.participants {
        let style = if app.responder == Some(p.staff_id) {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        people.push(Span::styled(format!(" {} ", p.staff_name), style));
        people.push(Span::raw(" "));
    }

    let header_lines = vec![
        Line::from(vec![
            Span::styled("  meeting ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                view.title.clone(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("   {}", view.status),
                Style::default().fg(Color::Cyan),
            ),
        ]),
        Line::from(people),
        Line::from(Span::styled(
            "  enter send · ^A ask all · ^S next staff · ^R resend · ^E edit · esc/^X stop · ^C quit",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let header = Paragraph::new(header_lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(ACCENT))
            .title(Span::styled(
                " huddle ",
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            )),
    );
    frame.render_widget(header, chunks[0]);

    // ── messages ──────────────────────────────────────────────────────────────
    let mut lines: Vec<Line> = vec![Line::raw("")];
    for msg in &view.messages {
        lines.extend(message_lines(msg, app.spin_i));
    }
    for notice in &app.notices {
        lines.extend(notice.to_lines());
    }

    let total = u16::try_from(lines.len()).unwrap_or(u16::MAX);
    let view_h = chunks[1].height.saturating_sub(2);
    let max_scroll = total.saturating_sub(view_h);
    if app.scroll == u16::MAX {
        app.scroll = max_scroll;
    }
    app.scroll = app.scroll.min(max_scroll);

    let msg_widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(" chat ", Style::default().fg(Color::DarkGray))),
        )
        .scroll((app.scroll, 0))
        .wrap(Wrap { trim: false });
    frame.render_widget(msg_widget, chunks[1]);

    // ── input ─────────────────────────────────────────────────────────────────
    let border_col = if view.streaming {
        Color::DarkGray
    } else {
        Color::Cyan
    };

    let before = &app.input[..app.cursor];
    let (cur_ch, after) = match app.input[app.cursor..].chars().next() {
        Some(ch) => {
            let end = app.cursor + ch.len_utf8();
            (ch.to_string(), app.input[end..].to_string())
        }
        None => (" ".to_string(), String::new()),
    };
    let input_line = Line::from(vec![
        Span::styled(before.to_string(), Style::default().fg(Color::White)),
        Span::styled(cur_ch, Style::default().fg(Color::Black).bg(Color::White)),
        Span::styled(after, Style::default().fg(Color::White)),
    ]);
    let title = match (app.editing, view.streaming) {
        (Some(id), _) => format!(" editing #{id} · esc cancels "),
        (None, true) => " message · streaming ".to_string(),
        (None, false) => " message ".to_string(),
    };
    let input_widget = Paragraph::new(input_line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_col))
            .title(Span::styled(title, Style::default().fg(border_col))),
    );
    frame.render_widget(input_widget, chunks[2]);

    if app.autocomplete.is_open() {
        render_mention_popup(app, chunks[2], area, frame);
    }
}

fn render_mention_popup(app: &App, input: Rect, area: Rect, frame: &mut Frame) {
    let candidates = app.autocomplete.candidates();
    let selected = app.autocomplete.selected();
    // keep the highlighted row visible
    let first = selected.saturating_sub(POPUP_ROWS - 1);
    let shown = candidates.len().min(POPUP_ROWS);

    let pop_h = shown as u16 + 2;
    let left = input.x.saturating_add(1);
    let pop_w = 56u16.min(area.width.saturating_sub(left));
    let pop_rect =
        Rect::new(left, input.y.saturating_sub(pop_h), pop_w, pop_h).intersection(area);
    if pop_rect.is_empty() {
        return;
    }

    let lines: Vec<Line> = candidates
        .iter()
        .enumerate()
        .skip(first)
        .take(shown)
        .map(|(i, m)| {
            let (style, desc_style) = if i == selected {
                let s = Style::default().fg(Color::Black).bg(ACCENT);
                (s, s)
            } else {
                (
                    Style::default().fg(Color::White),
                    Style::default().fg(Color::DarkGray),
                )
            };
            let kind = match m.kind {
                MentionKind::Image => "image",
                MentionKind::Asset => "asset",
            };
            Line::from(vec![
                Span::styled(format!(" {:<16}", m.display), style),
                Span::styled(format!(" {kind:<6}"), desc_style),
                Span::styled(
                    format!(" {}", m.description.as_deref().unwrap_or("")),
                    desc_style,
                ),
            ])
        })
        .collect();

    let popup = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(ACCENT))
            .title(Span::styled(" mentions ", Style::default().fg(ACCENT))),
    );
    frame.render_widget(Clear, pop_rect);
    frame.render_widget(popup, pop_rect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_core::{AssetType, CompanyAsset, MeetingImage, MentionIndex, Message, MessageId};
    use ratatui::{backend::TestBackend, Terminal};

    fn app_with_mentions() -> App {
        let mut app = App::new();
        app.mentions = MentionIndex::build(
            &[MeetingImage {
                id: 1,
                image_url: "/uploads/a.png".into(),
                description: Some("whiteboard".into()),
                display_order: Some(1),
                created_at: None,
            }],
            &[CompanyAsset {
                id: 2,
                asset_name: "logo".into(),
                display_name: Some("Company logo".into()),
                asset_type: AssetType::Image,
                file_path: "assets/1/logo.png".into(),
            }],
            "http://localhost:8001",
        );
        app
    }

    fn view(messages: Vec<Message>) -> RoomView {
        RoomView {
            title: "Launch".into(),
            status: "active".into(),
            participants: Vec::new(),
            messages,
            streaming: false,
        }
    }

    fn draw(width: u16, height: u16, app: &mut App, view: &RoomView) {
        let mut term = Terminal::new(TestBackend::new(width, height)).unwrap();
        term.draw(|f| render(app, view, f)).unwrap();
    }

    #[test]
    fn mention_popup_fits_narrow_terminals() {
        let view = view(Vec::new());
        for width in [50, 20, 2, 1] {
            let mut app = app_with_mentions();
            app.insert_char('@');
            assert!(app.autocomplete.is_open());
            draw(width, 24, &mut app, &view);
        }
    }

    #[test]
    fn mention_popup_in_a_short_terminal() {
        let mut app = app_with_mentions();
        app.insert_char('@');
        draw(80, 6, &mut app, &view(Vec::new()));
    }

    fn user_lines(n: i64) -> Vec<Message> {
        (0..n)
            .map(|i| {
                let mut m = Message::user(3, "User", format!("line {i}"));
                m.id = MessageId::Persisted(i);
                m
            })
            .collect()
    }

    #[test]
    fn scroll_clamps_to_the_last_page() {
        // 1 spacer + 2 lines per message, 14 visible rows at 80x24
        let view = view(user_lines(40));
        let mut app = App::new();
        app.scroll = u16::MAX - 1;
        draw(80, 24, &mut app, &view);
        assert_eq!(app.scroll, 81 - 14);
    }

    #[test]
    fn very_long_meetings_saturate_the_line_count() {
        let view = view(user_lines(33_000));
        let mut app = App::new();
        draw(80, 24, &mut app, &view);
        assert_eq!(app.scroll, u16::MAX - 14);
    }
}
