use rand::Rng;

use chatter_llm::{LlmError, LlmProvider};

use crate::bots::persona;
use crate::config::RoomCfg;
use crate::types::BotSnapshot;

/// True when `message` contains `@name` followed by a non-word character or
/// the end of the message.
pub fn is_mentioned(message: &str, name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let needle = format!("@{name}");
    message.match_indices(&needle).any(|(at, _)| {
        message[at + needle.len()..]
            .chars()
            .next()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_'))
    })
}

/// Which branch of the policy produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Mentioned; the mention roll decided.
    Mentioned(bool),
    /// Not mentioned; the spontaneous roll said respond.
    Spontaneous,
    /// Not mentioned, no spontaneous roll; the completion service answered.
    Consulted(bool),
}

impl Verdict {
    pub fn responds(self) -> bool {
        match self {
            Self::Mentioned(r) | Self::Consulted(r) => r,
            Self::Spontaneous => true,
        }
    }
}

/// Whether a bot replies to a message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponsePolicy {
    pub mention_probability: f64,
    pub spontaneous_probability: f64,
    pub consult_temperature: f32,
}

impl Default for ResponsePolicy {
    fn default() -> Self {
        Self::from_cfg(&RoomCfg::default())
    }
}

impl ResponsePolicy {
    pub fn from_cfg(cfg: &RoomCfg) -> Self {
        Self {
            mention_probability: cfg.mention_respond_probability,
            spontaneous_probability: cfg.spontaneous_respond_probability,
            consult_temperature: cfg.decision_temperature,
        }
    }

    /// Evaluate the policy for `bot` against `message`. The dice are rolled
    /// before the consult is awaited; only the consult branch can fail.
    pub async fn decide<P: LlmProvider + ?Sized>(
        &self,
        message: &str,
        bot: &BotSnapshot,
        oracle: &P,
    ) -> Result<Verdict, LlmError> {
        let mentioned = is_mentioned(message, &bot.name);
        let spontaneous = {
            let mut rng = rand::rng();
            if mentioned {
                return Ok(Verdict::Mentioned(rng.random_bool(self.mention_probability)));
            }
            rng.random_bool(self.spontaneous_probability)
        };
        if spontaneous {
            return Ok(Verdict::Spontaneous);
        }

        let request = persona::consult_request(bot, message, self.consult_temperature);
        let answer = oracle.complete(request).await?;
        Ok(Verdict::Consulted(persona::is_affirmative(&answer.content)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatter_llm::{MockProvider, ProviderKind};

    fn bot(name: &str) -> BotSnapshot {
        BotSnapshot {
            id: uuid::Uuid::nil(),
            name: name.into(),
            provider: ProviderKind::OpenAi,
            personality: "quirky".into(),
            temperature: 0.6,
            memory: String::new(),
        }
    }

    #[test]
    fn mention_needs_a_token_boundary() {
        assert!(is_mentioned("@A hello", "A"));
        assert!(is_mentioned("hey @Alice, sup", "Alice"));
        assert!(is_mentioned("ping @Alice", "Alice"));
        assert!(!is_mentioned("@Alice hi", "Al"));
        assert!(!is_mentioned("Alice hi", "Alice"));
        assert!(is_mentioned("@Al_x? no, @Al!", "Al"));
        assert!(!is_mentioned("@", ""));
    }

    #[tokio::test]
    async fn mentioned_bot_responds_about_95_percent() {
        let policy = ResponsePolicy::default();
        let oracle = MockProvider::new("no");
        let target = bot("A");
        let mut yes = 0u32;
        for _ in 0..1000 {
            if policy.decide("@A hello", &target, &oracle).await.unwrap().responds() {
                yes += 1;
            }
        }
        let rate = f64::from(yes) / 1000.0;
        assert!((0.92..=0.98).contains(&rate), "rate {rate}");
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn forced_consult_follows_the_oracle_exactly() {
        let policy = ResponsePolicy { spontaneous_probability: 0.0, ..ResponsePolicy::default() };
        let target = bot("B");

        let yes = MockProvider::new("Yes");
        for _ in 0..500 {
            assert_eq!(policy.decide("@A hello", &target, &yes).await.unwrap(), Verdict::Consulted(true));
        }
        assert_eq!(yes.calls(), 500);

        let no = MockProvider::new("no");
        for _ in 0..500 {
            assert_eq!(policy.decide("@A hello", &target, &no).await.unwrap(), Verdict::Consulted(false));
        }
    }

    #[tokio::test]
    async fn unmentioned_bot_is_spontaneous_about_30_percent() {
        let policy = ResponsePolicy::default();
        let oracle = MockProvider::new("no");
        let target = bot("B");
        let mut spontaneous = 0usize;
        for _ in 0..1000 {
            if policy.decide("hello", &target, &oracle).await.unwrap() == Verdict::Spontaneous {
                spontaneous += 1;
            }
        }
        let rate = spontaneous as f64 / 1000.0;
        assert!((0.24..=0.36).contains(&rate), "rate {rate}");
        assert_eq!(oracle.calls(), 1000 - spontaneous);
    }

    #[tokio::test]
    async fn consult_failure_is_returned() {
        let policy = ResponsePolicy { spontaneous_probability: 0.0, ..ResponsePolicy::default() };
        let oracle = MockProvider::failing(LlmError::RateLimited);
        assert!(matches!(policy.decide("hi", &bot("B"), &oracle).await, Err(LlmError::RateLimited)));
    }
}
