use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;

use chatter_core::Room;
use chatter_core::io::input::{self, InputSender};
use chatter_core::io::status::{RoomStatus, StatusReceiver};
use chatter_core::runtime::ShutdownGuard;
use chatter_core::types::{ChatMessage, RosterEntry};

use crate::event::AppEvent;
use crate::widgets;

/// Line editor and last status snapshot.
pub struct App {
    pub input: String,
    /// Byte offset into `input`, always on a char boundary.
    pub cursor: usize,
    pub status: RoomStatus,
    pub should_exit: bool,
}

/// Room state copied out for one frame.
pub struct View {
    pub messages: Vec<ChatMessage>,
    pub roster: Vec<RosterEntry>,
    /// The window ends at the newest message.
    pub follow_tail: bool,
}

impl App {
    fn new(status: RoomStatus) -> Self {
        Self { input: String::new(), cursor: 0, status, should_exit: false }
    }

    fn take_line(&mut self) -> Option<String> {
        let text = self.input.trim().to_owned();
        self.input.clear();
        self.cursor = 0;
        (!text.is_empty()).then_some(text)
    }

    fn insert_char(&mut self, c: char) {
        self.input.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    fn prev_boundary(&self) -> usize {
        self.input[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    fn delete_char_before_cursor(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = self.prev_boundary();
        self.input.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn move_cursor_left(&mut self) {
        self.cursor = self.prev_boundary();
    }

    fn move_cursor_right(&mut self) {
        if let Some(c) = self.input[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    /// Complete the `@partial` word ending at the cursor. `lookup` maps the
    /// partial name to a full one.
    fn complete_mention(&mut self, lookup: impl FnOnce(&str) -> Option<String>) -> bool {
        let before = &self.input[..self.cursor];
        let Some(at) = before.rfind('@') else {
            return false;
        };
        let partial = &before[at + 1..];
        if partial.chars().any(char::is_whitespace) {
            return false;
        }
        let Some(name) = lookup(partial) else {
            return false;
        };
        let completed = format!("{name} ");
        self.input.replace_range(at + 1..self.cursor, &completed);
        self.cursor = at + 1 + completed.len();
        true
    }
}

/// Run the terminal UI until Ctrl+C, `/quit`, or a quit signal.
pub async fn run_app(
    room: Arc<Room>,
    input_tx: InputSender,
    mut status_rx: StatusReceiver,
    quit: ShutdownGuard,
) -> anyhow::Result<()> {
    terminal::enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(std::io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let stop = Arc::new(AtomicBool::new(false));
    let mut event_rx = crate::event::spawn(stop.clone());

    let mut app = App::new(status_rx.borrow().clone());
    // the connected-time clock ticks even when nothing else happens
    let mut clock = tokio::time::interval(std::time::Duration::from_millis(500));
    clock.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result = loop {
        if app.should_exit {
            break Ok(());
        }
        if let Err(e) = draw(&mut terminal, &room, &app) {
            break Err(e);
        }
        tokio::select! {
            _ = quit.requested() => break Ok(()),
            evt = event_rx.recv() => {
                let Some(evt) = evt else { break Ok(()) };
                match evt {
                    AppEvent::Key(key) => handle_key(&mut app, key, &room, &input_tx, &quit).await,
                    AppEvent::Resize => {}
                }
            }
            Ok(()) = status_rx.changed() => {
                app.status = status_rx.borrow_and_update().clone();
            }
            _ = clock.tick() => {}
        }
    };

    stop.store(true, Ordering::Relaxed);
    terminal::disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), LeaveAlternateScreen)?;
    result
}

fn draw(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    room: &Room,
    app: &App,
) -> anyhow::Result<()> {
    let size = terminal.size()?;
    let rows = widgets::chat_rows(Rect::new(0, 0, size.width, size.height));
    room.chat().set_visible_height(rows);
    let (messages, follow_tail) = room
        .chat()
        .inspect(|s| (s.visible(), s.scroll_position() >= s.max_scroll()));
    let view = View { messages, roster: room.roster(), follow_tail };
    terminal.draw(|f| widgets::draw(f, app, &view))?;
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent, room: &Room, input_tx: &InputSender, quit: &ShutdownGuard) {
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
            quit.trigger();
            app.should_exit = true;
        }
        (_, KeyCode::Enter) => {
            if let Some(line) = app.take_line()
                && input::submit_line(input_tx, line).await.is_err()
            {
                app.should_exit = true;
            }
        }
        (_, KeyCode::Tab) => {
            app.complete_mention(|partial| room.complete_mention(partial));
        }
        (_, KeyCode::Backspace) => app.delete_char_before_cursor(),
        (_, KeyCode::Left) => app.move_cursor_left(),
        (_, KeyCode::Right) => app.move_cursor_right(),
        (_, KeyCode::Up) => room.chat().scroll_up(1),
        (_, KeyCode::Down) => room.chat().scroll_down(1),
        (_, KeyCode::PageUp) => room.chat().scroll_up(room.chat().inspect(|s| s.visible_height())),
        (_, KeyCode::PageDown) => room.chat().scroll_down(room.chat().inspect(|s| s.visible_height())),
        (_, KeyCode::Home) => app.cursor = 0,
        (_, KeyCode::End) => app.cursor = app.input.len(),
        (_, KeyCode::Char(c)) => app.insert_char(c),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_with(text: &str) -> App {
        let mut app = App::new(RoomStatus::default());
        for c in text.chars() {
            app.insert_char(c);
        }
        app
    }

    #[test]
    fn tab_completes_mention_at_cursor() {
        let mut app = app_with("hey @Mar");
        assert!(app.complete_mention(|p| (p == "Mar").then(|| "Marvin".to_owned())));
        assert_eq!(app.input, "hey @Marvin ");
        assert_eq!(app.cursor, app.input.len());
    }

    #[test]
    fn tab_without_mention_does_nothing() {
        let mut app = app_with("hey there");
        assert!(!app.complete_mention(|_| Some("x".into())));
        let mut app = app_with("@Mar vin");
        assert!(!app.complete_mention(|_| Some("x".into())));
        assert_eq!(app.input, "@Mar vin");
    }

    #[test]
    fn editing_respects_multibyte_chars() {
        let mut app = app_with("héllo");
        app.move_cursor_left();
        app.move_cursor_left();
        app.move_cursor_left();
        app.delete_char_before_cursor();
        assert_eq!(app.input, "hllo");
        app.move_cursor_right();
        app.insert_char('!');
        assert_eq!(app.input, "hl!lo");
    }

    #[test]
    fn take_line_trims_and_clears() {
        let mut app = app_with("  /kick all  ");
        assert_eq!(app.take_line().as_deref(), Some("/kick all"));
        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert_eq!(app.take_line(), None);
    }
}
