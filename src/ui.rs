use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use crate::app::{App, Focus};
use crate::navigator::Screen;
use crate::session::{Message, Sender};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: key bar, body, footer
    let [key_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    match app.screen {
        Screen::Chat => {
            render_key_bar(app, frame, key_area);
            render_chat_screen(app, frame, body_area);
        }
    }

    render_footer(app, frame, footer_area);
}

fn render_key_bar(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == Focus::ApiKey;
    let border_color = if focused { Color::Yellow } else { Color::Green };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(Span::styled(" 🎓 Chatbot ", Style::default().fg(Color::Green).bold()))
        .title(Line::from(" API key ").alignment(Alignment::Right));

    // Masking keeps one column per character, so the key cursor indexes
    // the masked text directly.
    let inner_width = area.width.saturating_sub(2) as usize;
    let key = app.session.api_key();
    let cursor_pos = app.api_key_cursor.min(key.chars().count());
    let scroll_offset = field_scroll_offset(cursor_pos, inner_width);

    let field = if key.is_empty() {
        Paragraph::new(Span::styled(
            "Enter API Key",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let visible: String = mask_api_key(key)
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Paragraph::new(visible).style(Style::default().fg(Color::Cyan))
    };

    frame.render_widget(field.block(block), area);

    if focused {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    render_messages(app, frame, chat_area);
    render_input(app, frame, input_area);
}

fn render_messages(app: &mut App, frame: &mut Frame, area: Rect) {
    let pending = app.session.is_pending();

    // Measure the same paragraph that is drawn, so following the tail
    // always lands on the last rendered row.
    let inner_height = area.height.saturating_sub(2);
    let inner_width = area.width.saturating_sub(2);
    let total_lines = log_height(app.session.messages(), pending, inner_width);
    app.viewport_mut().update(inner_height, inner_width, total_lines);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Messages ");

    let chat = log_paragraph(app.session.messages(), pending, app.animation_frame)
        .block(block)
        .scroll((app.viewport().scroll, 0));

    frame.render_widget(chat, area);
}

/// The message log as drawn inside the chat block.
pub fn log_paragraph(messages: &[Message], pending: bool, animation_frame: u8) -> Paragraph<'_> {
    let text = if messages.is_empty() && !pending {
        Text::from(Span::styled(
            "Enter your API key above, then ask a question below...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in messages {
            let (label, color, alignment) = match msg.sender {
                Sender::User => ("You:", Color::Cyan, Alignment::Right),
                Sender::Bot => ("Bot:", Color::Yellow, Alignment::Left),
                Sender::System => ("System:", Color::Red, Alignment::Left),
            };

            lines.push(
                Line::from(Span::styled(
                    label,
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ))
                .alignment(alignment),
            );
            for line in msg.text.lines() {
                lines.push(Line::from(line).alignment(alignment));
            }
            lines.push(Line::default());
        }

        if pending {
            lines.push(Line::from(Span::styled(
                "Bot:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Detecting{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    Paragraph::new(text).wrap(Wrap { trim: true })
}

/// Rows the log takes once word-wrapped at `width` columns.
pub fn log_height(messages: &[Message], pending: bool, width: u16) -> u16 {
    // Default to 50 before the first draw has measured the area
    let width = if width > 0 { width } else { 50 };
    // Widest animation frame, so the indicator never needs an unmeasured row
    let rows = log_paragraph(messages, pending, 2).line_count(width);
    u16::try_from(rows).unwrap_or(u16::MAX)
}

/// First visible character of a single-line field so the cursor stays
/// inside `inner_width` columns.
fn field_scroll_offset(cursor_pos: usize, inner_width: usize) -> usize {
    if inner_width == 0 || cursor_pos < inner_width {
        0
    } else {
        cursor_pos - inner_width + 1
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == Focus::Question;
    let border_color = if focused { Color::Yellow } else { Color::DarkGray };

    let send_hint = if app.session.is_pending() {
        Span::styled(" ... ", Style::default().fg(Color::DarkGray))
    } else if app.session.can_submit() {
        Span::styled(" Send ⏎ ", Style::default().fg(Color::Green).bold())
    } else {
        Span::styled(" Send ", Style::default().fg(Color::DarkGray))
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Question ")
        .title(Line::from(send_hint).alignment(Alignment::Right));

    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.draft_cursor;
    let scroll_offset = field_scroll_offset(cursor_pos, inner_width);

    let draft = app.session.draft();
    let input = if draft.is_empty() && !focused {
        Paragraph::new(Span::styled(
            "Type your question...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let visible_text: String = draft
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };

    frame.render_widget(input.block(block), area);

    if focused {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let field = match app.focus {
        Focus::ApiKey => " KEY ",
        Focus::Question => " ASK ",
    };

    let footer = Line::from(vec![
        Span::styled(field, Style::default().fg(Color::Black).bg(Color::Yellow).bold()),
        Span::raw(" "),
        Span::styled("Tab", Style::default().fg(Color::Cyan)),
        Span::raw(" switch field  "),
        Span::styled("Enter", Style::default().fg(Color::Cyan)),
        Span::raw(" send  "),
        Span::styled("PgUp/PgDn", Style::default().fg(Color::Cyan)),
        Span::raw(" scroll  "),
        Span::styled("Esc", Style::default().fg(Color::Cyan)),
        Span::raw(" quit  "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(footer), area);
}

/// Mask all but the last four characters of the key, one `*` per character.
pub fn mask_api_key(key: &str) -> String {
    let char_count = key.chars().count();
    if char_count <= 4 {
        return "*".repeat(char_count);
    }

    let masked_len = char_count - 4;
    let last_four: String = key.chars().skip(masked_len).collect();
    format!("{}{}", "*".repeat(masked_len), last_four)
}
