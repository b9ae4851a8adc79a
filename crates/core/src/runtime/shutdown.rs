use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Room-wide quit request. `/quit`, Ctrl+C in the terminal, and SIGTERM all
/// trip the same token; the owner then runs the ordered shutdown.
#[derive(Debug, Clone, Default)]
pub struct ShutdownGuard {
    token: CancellationToken,
}

impl ShutdownGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once a quit has been requested.
    pub async fn requested(&self) {
        self.token.cancelled().await;
    }

    /// Trip the token on SIGTERM (Ctrl+C off unix).
    pub fn spawn_signal_listener(&self) {
        let token = self.token.clone();
        tokio::spawn(async move {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        tokio::select! {
                            _ = sigterm.recv() => tracing::info!("received SIGTERM, leaving the room"),
                            _ = token.cancelled() => return,
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to register SIGTERM handler");
                        return;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                tokio::select! {
                    _ = signal::ctrl_c() => tracing::info!("received Ctrl+C, leaving the room"),
                    _ = token.cancelled() => return,
                }
            }
            token.cancel();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_one_quit_request() {
        let guard = ShutdownGuard::new();
        let other = guard.clone();
        assert!(!guard.is_triggered());
        other.trigger();
        guard.requested().await;
        assert!(guard.is_triggered());
    }

    #[tokio::test]
    async fn signal_listener_exits_after_quit() {
        let guard = ShutdownGuard::new();
        guard.spawn_signal_listener();
        guard.trigger();
        tokio::task::yield_now().await;
        assert!(guard.token().is_cancelled());
    }
}
