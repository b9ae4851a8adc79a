//! Shared transcript: the ring buffer, its scroll view, and the on-disk log.

pub mod state;
pub mod transcript;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use state::{CHAT_HISTORY_LIMIT, ChatState};
pub use transcript::TranscriptLog;

use crate::io::status::StatusBoard;
use crate::types::ChatMessage;

#[derive(Debug)]
struct ChatInner {
    state: ChatState,
    log: Option<TranscriptLog>,
}

/// Handle to the process-wide transcript.
///
/// The chat lock is private to this type and every method releases it before
/// returning, so no caller can hold it while taking another component's lock.
#[derive(Debug, Clone)]
pub struct SharedChat {
    inner: Arc<Mutex<ChatInner>>,
    status: StatusBoard,
}

impl SharedChat {
    pub fn new(state: ChatState, log: Option<TranscriptLog>, status: StatusBoard) -> Self {
        Self { inner: Arc::new(Mutex::new(ChatInner { state, log })), status }
    }

    fn lock(&self) -> MutexGuard<'_, ChatInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append under the chat lock (log line included, so file order matches
    /// ring order), then notify the display.
    pub fn post(&self, message: ChatMessage) {
        {
            let mut guard = self.lock();
            let inner = &mut *guard;
            let failed = inner.log.as_mut().and_then(|log| {
                log.write_message(&message)
                    .err()
                    .map(|e| (e, log.path().display().to_string()))
            });
            if let Some((e, path)) = failed {
                tracing::warn!(error = %e, %path, "transcript log write failed, logging disabled");
                inner.log = None;
            }
            inner.state.append(message);
        }
        self.status.transcript_changed();
    }

    /// Post an engine message on the system channel.
    pub fn system(&self, text: impl AsRef<str>) {
        self.post(ChatMessage::system(text));
    }

    pub fn recent(&self, n: usize) -> Vec<ChatMessage> {
        self.lock().state.recent(n)
    }

    pub fn visible(&self) -> Vec<ChatMessage> {
        self.lock().state.visible()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.lock().state.messages().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().state.is_empty()
    }

    pub fn scroll_position(&self) -> usize {
        self.lock().state.scroll_position()
    }

    pub fn scroll_up(&self, lines: usize) {
        self.lock().state.scroll_up(lines);
        self.status.transcript_changed();
    }

    pub fn scroll_down(&self, lines: usize) {
        self.lock().state.scroll_down(lines);
        self.status.transcript_changed();
    }

    pub fn set_visible_height(&self, height: usize) {
        self.lock().state.set_visible_height(height);
    }

    /// Read-only access for inspections not covered above.
    pub fn inspect<R>(&self, f: impl FnOnce(&ChatState) -> R) -> R {
        f(&self.lock().state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SenderRole;

    fn shared() -> (SharedChat, crate::io::status::StatusReceiver) {
        let (board, rx) = StatusBoard::new("user");
        (SharedChat::new(ChatState::new(), None, board), rx)
    }

    #[test]
    fn post_bumps_transcript_revision() {
        let (chat, rx) = shared();
        chat.post(ChatMessage::user("user", "hi"));
        chat.system("Bot kicked.");
        assert_eq!(chat.len(), 2);
        assert_eq!(rx.borrow().transcript_rev, 2);
        assert_eq!(chat.recent(1)[0].role, SenderRole::System);
    }

    #[test]
    fn post_writes_through_to_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.log");
        let (board, _rx) = StatusBoard::new("user");
        let chat = SharedChat::new(ChatState::new(), Some(TranscriptLog::open(Some(&path)).unwrap()), board);
        chat.post(ChatMessage::assistant("Zed", "first"));
        chat.system("second");
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("<Zed> first"));
        assert!(text.contains("<system> second"));
    }

    #[test]
    fn concurrent_posts_are_all_kept() {
        let (chat, _rx) = shared();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let chat = chat.clone();
                std::thread::spawn(move || {
                    for i in 0..10 {
                        chat.post(ChatMessage::assistant(format!("bot{t}"), format!("{i}")));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(chat.len(), 80);
        assert_eq!(chat.inspect(|s| s.total_appended()), 80);
    }
}
