use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use unicode_width::UnicodeWidthStr;

use chatter_core::types::{ChatMessage, SenderRole};

use crate::tui::{App, View};

const SIDEBAR_WIDTH: u16 = 24;
const INPUT_HEIGHT: u16 = 3;
const INPUT_PREFIX: &str = "> ";

struct Areas {
    chat: Rect,
    sidebar: Rect,
    status: Rect,
    input: Rect,
}

fn split(area: Rect) -> Areas {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1), Constraint::Length(INPUT_HEIGHT)])
        .split(area);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(SIDEBAR_WIDTH)])
        .split(rows[0]);
    Areas { chat: cols[0], sidebar: cols[1], status: rows[1], input: rows[2] }
}

/// Message rows available inside the chat pane for a terminal of `area`.
pub fn chat_rows(area: Rect) -> usize {
    split(area).chat.height.saturating_sub(2).max(1) as usize
}

pub fn draw(f: &mut Frame, app: &App, view: &View) {
    let areas = split(f.area());
    draw_chat(f, view, areas.chat);
    draw_sidebar(f, app, view, areas.sidebar);
    draw_status(f, app, areas.status);
    draw_input(f, app, areas.input);
}

fn name_style(role: SenderRole) -> Style {
    match role {
        SenderRole::User => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        SenderRole::Assistant => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        SenderRole::System => Style::default().fg(Color::Yellow),
    }
}

fn message_line(msg: &ChatMessage) -> Line<'_> {
    let body = match msg.role {
        SenderRole::System => Style::default().fg(Color::DarkGray),
        _ => Style::default(),
    };
    Line::from(vec![
        Span::styled(format!("{} ", msg.stamp()), Style::default().fg(Color::DarkGray)),
        Span::styled(format!("<{}>", msg.display_name), name_style(msg.role)),
        Span::raw(" "),
        Span::styled(msg.content.as_str(), body),
    ])
}

fn draw_chat(f: &mut Frame, view: &View, area: Rect) {
    let lines: Vec<Line> = view.messages.iter().map(message_line).collect();
    let scroll = chat_scroll(&lines, area.width.saturating_sub(2), area.height.saturating_sub(2), view.follow_tail);

    let para = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" chat "))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(para, area);
}

/// Rows to skip in the chat pane. A scrolled-back window is shown from its
/// first message; at the tail the newest wrapped rows stay in view.
fn chat_scroll(lines: &[Line], width: u16, visible: u16, follow_tail: bool) -> u16 {
    if !follow_tail || width == 0 {
        return 0;
    }
    let rows = Paragraph::new(lines.to_vec()).wrap(Wrap { trim: false }).line_count(width);
    u16::try_from(rows).unwrap_or(u16::MAX).saturating_sub(visible)
}

fn draw_sidebar(f: &mut Frame, app: &App, view: &View, area: Rect) {
    let mut lines = vec![
        Line::from(Span::styled("Users:", Style::default().add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(format!("@{}", app.status.user_name), name_style(SenderRole::User))),
    ];
    for bot in &view.roster {
        let style = if bot.is_typing {
            Style::default().fg(Color::Black).bg(Color::Green)
        } else {
            Style::default().fg(Color::Green)
        };
        lines.push(Line::from(Span::styled(format!("+{} [{}]", bot.name, bot.provider), style)));
    }
    let para = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" room "));
    f.render_widget(para, area);
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let text = format!(
        " Time Connected: {} | Sent: {} | Received: {}",
        app.status.connected_for(),
        app.status.messages_sent,
        app.status.messages_received
    );
    let para = Paragraph::new(Line::from(Span::styled(text, Style::default().fg(Color::DarkGray))));
    f.render_widget(para, area);
}

fn draw_input(f: &mut Frame, app: &App, area: Rect) {
    let inner_w = area.width.saturating_sub(2) as usize;
    let before_cursor = INPUT_PREFIX.width() + app.input[..app.cursor].width();
    // scroll horizontally so the cursor stays inside the box
    let offset = if inner_w > 0 { before_cursor.saturating_sub(inner_w - 1) } else { 0 };

    let para = Paragraph::new(Line::from(vec![Span::raw(INPUT_PREFIX), Span::raw(app.input.as_str())]))
        .block(Block::default().borders(Borders::ALL))
        .scroll((0, offset as u16));
    f.render_widget(para, area);
    f.set_cursor_position(Position::new(
        area.x + 1 + (before_cursor - offset) as u16,
        area.y + 1,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrolled_back_window_starts_at_its_first_message() {
        let lines = vec![Line::from("a long message that wraps over several rows"); 4];
        assert_eq!(chat_scroll(&lines, 10, 3, false), 0);
        assert!(chat_scroll(&lines, 10, 3, true) > 0);
    }

    #[test]
    fn tail_scroll_counts_word_wrapped_rows() {
        // greedy char wrapping fits this in two rows of 6; word wrapping needs three
        let lines = vec![Line::from("aa bbbbb cc")];
        assert!(chat_scroll(&lines, 6, 1, true) >= 2);
        assert_eq!(chat_scroll(&lines, 80, 1, true), 0);
    }

    #[test]
    fn chat_rows_leave_room_for_borders_status_and_input() {
        let rows = chat_rows(Rect::new(0, 0, 80, 24));
        assert_eq!(rows, 24 - 1 - INPUT_HEIGHT as usize - 2);
    }

    #[test]
    fn message_line_has_stamp_name_and_body() {
        let msg = ChatMessage::assistant("Zed", "sup");
        let text: String = message_line(&msg).spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(text.ends_with("<Zed> sup"));
        assert!(text.starts_with('['));
    }
}
