use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use tokio::sync::mpsc;

/// Terminal events consumed by the TUI loop.
#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
}

/// Read crossterm events on a dedicated thread until `stop` is set.
pub fn spawn(stop: Arc<AtomicBool>) -> mpsc::UnboundedReceiver<AppEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            if !event::poll(Duration::from_millis(50)).unwrap_or(false) {
                continue;
            }
            let forwarded = match event::read() {
                Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => tx.send(AppEvent::Key(key)),
                Ok(Event::Resize(..)) => tx.send(AppEvent::Resize),
                _ => Ok(()),
            };
            if forwarded.is_err() {
                break;
            }
        }
    });
    rx
}
