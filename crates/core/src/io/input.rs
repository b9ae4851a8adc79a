use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::room::{LineOutcome, Room};
use crate::runtime::shutdown::ShutdownGuard;

/// Lines buffered between the display surface and the input loop.
pub const INPUT_BUFFER: usize = 64;

/// Input channel sender. The display surface pushes finished lines here.
pub type InputSender = mpsc::Sender<String>;
/// Input channel receiver. Only the input loop consumes from here.
pub type InputReceiver = mpsc::Receiver<String>;

pub fn channel() -> (InputSender, InputReceiver) {
    mpsc::channel(INPUT_BUFFER)
}

/// Submit one line typed by the human.
pub async fn submit_line(tx: &InputSender, line: impl Into<String>) -> Result<(), mpsc::error::SendError<String>> {
    tx.send(line.into()).await
}

/// Spawn the loop that runs each line through the room, one at a time.
/// `/quit` trips `quit`; `cancel` stops the loop even mid-line.
pub fn spawn_input_loop(
    room: Arc<Room>,
    mut rx: InputReceiver,
    quit: ShutdownGuard,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let line = tokio::select! {
                _ = cancel.cancelled() => break,
                line = rx.recv() => match line {
                    Some(line) => line,
                    None => break,
                },
            };
            let outcome = tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = room.handle_line(&line) => outcome,
            };
            if outcome == LineOutcome::Quit {
                tracing::info!("quit requested");
                quit.trigger();
                break;
            }
        }
        tracing::debug!("input loop stopped");
    })
}
