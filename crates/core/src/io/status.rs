use std::time::Instant;

use tokio::sync::watch;

/// Snapshot the display surface renders from: counters, the human's name,
/// and revision numbers that tell it when to re-read the transcript or roster.
#[derive(Debug, Clone)]
pub struct RoomStatus {
    pub user_name: String,
    pub started_at: Instant,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub transcript_rev: u64,
    pub roster_rev: u64,
}

impl Default for RoomStatus {
    fn default() -> Self {
        Self {
            user_name: "user".into(),
            started_at: Instant::now(),
            messages_sent: 0,
            messages_received: 0,
            transcript_rev: 0,
            roster_rev: 0,
        }
    }
}

impl RoomStatus {
    /// Whole seconds since the room started.
    pub fn elapsed_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// `MM:SS` connection time, minutes uncapped.
    pub fn connected_for(&self) -> String {
        let secs = self.elapsed_secs();
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}

/// Status watch channel types.
pub type StatusReceiver = watch::Receiver<RoomStatus>;

/// Write side of the status channel. Cheap to clone.
///
/// The watch channel has its own internal lock; callers never hold a chat or
/// registry guard while touching the board.
#[derive(Debug, Clone)]
pub struct StatusBoard {
    tx: watch::Sender<RoomStatus>,
}

impl StatusBoard {
    pub fn new(user_name: impl Into<String>) -> (Self, StatusReceiver) {
        let status = RoomStatus { user_name: user_name.into(), ..RoomStatus::default() };
        let (tx, rx) = watch::channel(status);
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> StatusReceiver {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> RoomStatus {
        self.tx.borrow().clone()
    }

    pub fn user_name(&self) -> String {
        self.tx.borrow().user_name.clone()
    }

    pub fn set_user_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.tx.send_modify(|s| {
            s.user_name = name;
            s.roster_rev += 1;
        });
    }

    pub fn message_sent(&self) {
        self.tx.send_modify(|s| s.messages_sent += 1);
    }

    pub fn message_received(&self) {
        self.tx.send_modify(|s| s.messages_received += 1);
    }

    pub fn transcript_changed(&self) {
        self.tx.send_modify(|s| s.transcript_rev += 1);
    }

    pub fn roster_changed(&self) {
        self.tx.send_modify(|s| s.roster_rev += 1);
    }
}
