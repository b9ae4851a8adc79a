use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bots::persona;
use crate::config::RoomCfg;
use crate::dispatch::Dispatcher;

/// How often a bot considers speaking up on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct AutonomyTiming {
    pub interval_secs: RangeInclusive<u64>,
    pub speak_probability: f64,
}

impl AutonomyTiming {
    pub fn from_cfg(cfg: &RoomCfg) -> Self {
        let lo = cfg.autonomous_min_secs;
        Self {
            interval_secs: lo..=cfg.autonomous_max_secs.max(lo),
            speak_probability: cfg.autonomous_speak_probability,
        }
    }

    fn next_wake(&self) -> Duration {
        Duration::from_secs(rand::rng().random_range(self.interval_secs.clone()))
    }

    fn wants_to_speak(&self) -> bool {
        rand::rng().random_bool(self.speak_probability)
    }
}

impl Default for AutonomyTiming {
    fn default() -> Self {
        Self::from_cfg(&RoomCfg::default())
    }
}

/// Spawn a bot's background loop. The token is checked before every sleep and
/// right after waking; a dispatch in progress is abandoned on cancellation.
pub fn spawn(
    name: String,
    personality: String,
    dispatcher: Arc<Dispatcher>,
    timing: AutonomyTiming,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(bot = %name, "autonomous loop started");
        while !cancel.is_cancelled() {
            let wait = timing.next_wake();
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
            if cancel.is_cancelled() {
                break;
            }
            if !timing.wants_to_speak() {
                continue;
            }

            let message = persona::autonomous_message(&name, &personality);
            tokio::select! {
                _ = cancel.cancelled() => break,
                summary = dispatcher.dispatch(&message, &name) => {
                    tracing::debug!(bot = %name, accepted = summary.accepted.len(), "autonomous message dispatched");
                }
            }
        }
        tracing::info!(bot = %name, "autonomous loop stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_follows_config() {
        let t = AutonomyTiming::default();
        assert_eq!(t.interval_secs, 5..=30);
        assert!((t.speak_probability - 0.30).abs() < f64::EPSILON);
        for _ in 0..200 {
            let d = t.next_wake();
            assert!(d >= Duration::from_secs(5) && d <= Duration::from_secs(30));
        }
    }

    #[test]
    fn inverted_interval_collapses() {
        let cfg = RoomCfg { autonomous_min_secs: 9, autonomous_max_secs: 2, ..RoomCfg::default() };
        assert_eq!(AutonomyTiming::from_cfg(&cfg).interval_secs, 9..=9);
    }
}
