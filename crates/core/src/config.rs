use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::bots::MAX_BOTS;
use crate::error::RoomError;

/// Prefix for environment overrides, e.g. `CHATTER_MAX_WORKERS=4`.
pub const ENV_PREFIX: &str = "CHATTER_";

/// All chat-room engine parameters.
/// Defaults mirror the classic room; any field can be overridden from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomCfg {
    // capacities
    pub max_bots: usize,
    pub max_workers: usize,

    // response decision
    pub mention_respond_probability: f64,
    pub spontaneous_respond_probability: f64,
    pub decision_temperature: f32,

    // dispatcher typing latency (ms)
    pub typing_delay_min_ms: u64,
    pub typing_delay_max_ms: u64,

    // autonomous chatter
    pub autonomous_min_secs: u64,
    pub autonomous_max_secs: u64,
    pub autonomous_speak_probability: f64,

    // generation
    pub context_messages: usize,
    pub response_max_tokens: u32,
    pub personality_max_tokens: u32,

    // shutdown
    pub shutdown_timeout_secs: u64,
}

impl Default for RoomCfg {
    fn default() -> Self {
        Self {
            max_bots: MAX_BOTS,
            max_workers: 10,
            mention_respond_probability: 0.95,
            spontaneous_respond_probability: 0.30,
            decision_temperature: 0.7,
            typing_delay_min_ms: 1000,
            typing_delay_max_ms: 3000,
            autonomous_min_secs: 5,
            autonomous_max_secs: 30,
            autonomous_speak_probability: 0.30,
            context_messages: 5,
            response_max_tokens: 512,
            personality_max_tokens: 50,
            shutdown_timeout_secs: 15,
        }
    }
}

impl RoomCfg {
    /// Defaults overridden by any `CHATTER_<FIELD>` environment variables.
    pub fn from_env() -> Self {
        let map: HashMap<String, String> = std::env::vars()
            .filter_map(|(k, v)| {
                k.strip_prefix(ENV_PREFIX)
                    .map(|field| (field.to_ascii_lowercase(), v))
            })
            .collect();
        Self::from_map(&map)
    }

    pub fn from_map(m: &HashMap<String, String>) -> Self {
        let d = Self::default();
        Self {
            max_bots: get_or(m, "max_bots", d.max_bots).clamp(1, MAX_BOTS),
            max_workers: get_or(m, "max_workers", d.max_workers).max(1),
            mention_respond_probability: probability(get_or(m, "mention_respond_probability", d.mention_respond_probability)),
            spontaneous_respond_probability: probability(get_or(m, "spontaneous_respond_probability", d.spontaneous_respond_probability)),
            decision_temperature: get_or(m, "decision_temperature", d.decision_temperature),
            typing_delay_min_ms: get_or(m, "typing_delay_min_ms", d.typing_delay_min_ms),
            typing_delay_max_ms: get_or(m, "typing_delay_max_ms", d.typing_delay_max_ms),
            autonomous_min_secs: get_or(m, "autonomous_min_secs", d.autonomous_min_secs),
            autonomous_max_secs: get_or(m, "autonomous_max_secs", d.autonomous_max_secs),
            autonomous_speak_probability: probability(get_or(m, "autonomous_speak_probability", d.autonomous_speak_probability)),
            context_messages: get_or(m, "context_messages", d.context_messages),
            response_max_tokens: get_or(m, "response_max_tokens", d.response_max_tokens),
            personality_max_tokens: get_or(m, "personality_max_tokens", d.personality_max_tokens),
            shutdown_timeout_secs: get_or(m, "shutdown_timeout_secs", d.shutdown_timeout_secs),
        }
    }
}

fn get_or<T: std::str::FromStr>(map: &HashMap<String, String>, key: &str, default: T) -> T {
    map.get(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn probability(p: f64) -> f64 {
    if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 }
}

/// API keys for the two completion providers. Both are required at startup.
#[derive(Clone)]
pub struct Credentials {
    pub openai_api_key: String,
    pub anthropic_api_key: String,
}

impl Credentials {
    pub const OPENAI_VAR: &'static str = "OPENAI_API_KEY";
    pub const ANTHROPIC_VAR: &'static str = "ANTHROPIC_API_KEY";

    /// Validate both keys; a missing or blank key is fatal.
    pub fn resolve(openai: Option<String>, anthropic: Option<String>) -> Result<Self, RoomError> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let missing: Vec<&str> = [
            (present(openai.clone()).is_none(), Self::OPENAI_VAR),
            (present(anthropic.clone()).is_none(), Self::ANTHROPIC_VAR),
        ]
        .into_iter()
        .filter_map(|(absent, var)| absent.then_some(var))
        .collect();

        match (present(openai), present(anthropic)) {
            (Some(openai_api_key), Some(anthropic_api_key)) => Ok(Self { openai_api_key, anthropic_api_key }),
            _ => Err(RoomError::Fatal(format!(
                "API keys not set in environment variables: {}",
                missing.join(", ")
            ))),
        }
    }

    pub fn from_env() -> Result<Self, RoomError> {
        Self::resolve(std::env::var(Self::OPENAI_VAR).ok(), std::env::var(Self::ANTHROPIC_VAR).ok())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &"<redacted>")
            .field("anthropic_api_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_room() {
        let cfg = RoomCfg::default();
        assert_eq!(cfg.max_bots, 10);
        assert_eq!(cfg.max_workers, 10);
        assert_eq!(cfg.typing_delay_min_ms, 1000);
        assert_eq!(cfg.typing_delay_max_ms, 3000);
        assert_eq!(cfg.autonomous_min_secs, 5);
        assert_eq!(cfg.autonomous_max_secs, 30);
    }

    #[test]
    fn map_overrides_and_ignores_garbage() {
        let mut m = HashMap::new();
        m.insert("max_workers".to_owned(), "4".to_owned());
        m.insert("typing_delay_max_ms".to_owned(), "not-a-number".to_owned());
        m.insert("spontaneous_respond_probability".to_owned(), "7.5".to_owned());
        let cfg = RoomCfg::from_map(&m);
        assert_eq!(cfg.max_workers, 4);
        assert_eq!(cfg.typing_delay_max_ms, 3000);
        assert_eq!(cfg.spontaneous_respond_probability, 1.0);
    }

    #[test]
    fn zero_workers_is_raised_to_one() {
        let mut m = HashMap::new();
        m.insert("max_workers".to_owned(), "0".to_owned());
        assert_eq!(RoomCfg::from_map(&m).max_workers, 1);
    }

    #[test]
    fn bot_limit_stays_within_the_room_maximum() {
        let mut m = HashMap::new();
        m.insert("max_bots".to_owned(), "25".to_owned());
        assert_eq!(RoomCfg::from_map(&m).max_bots, MAX_BOTS);
        m.insert("max_bots".to_owned(), "0".to_owned());
        assert_eq!(RoomCfg::from_map(&m).max_bots, 1);
        m.insert("max_bots".to_owned(), "3".to_owned());
        assert_eq!(RoomCfg::from_map(&m).max_bots, 3);
    }

    #[test]
    fn credentials_require_both_keys() {
        assert!(Credentials::resolve(Some("sk".into()), Some("ant".into())).is_ok());
        let err = Credentials::resolve(Some("sk".into()), None).unwrap_err();
        assert!(matches!(err, RoomError::Fatal(ref msg) if msg.contains(Credentials::ANTHROPIC_VAR)));
        let err = Credentials::resolve(Some("  ".into()), Some("ant".into())).unwrap_err();
        assert!(matches!(err, RoomError::Fatal(ref msg) if msg.contains(Credentials::OPENAI_VAR)));
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let c = Credentials::resolve(Some("sk-secret".into()), Some("ant-secret".into())).unwrap();
        let shown = format!("{c:?}");
        assert!(!shown.contains("secret"));
    }
}
