use rand::Rng;

use chatter_llm::{CompletionRequest, LlmError, LlmProvider};

use crate::types::{BotSnapshot, ChatMessage};

/// Personality used when the utility model cannot produce one.
pub const DEFAULT_PERSONALITY: &str = "Default personality";

/// Bot temperatures are drawn from `[TEMPERATURE_MIN, TEMPERATURE_MAX)`.
pub const TEMPERATURE_MIN: f32 = 0.5;
pub const TEMPERATURE_MAX: f32 = 1.0;

const PERSONALITY_PROMPT: &str = "Generate a short, one-sentence personality description \
    for a chatbot inspired by various online communities. Include a mix of traits such as \
    helpful, sarcastic, meme-loving, intellectual, optimistic, cynical, or quirky. \
    Aim for diversity in personalities. \
    Ensure the personality is unique and different from these existing personalities: ";

/// Cap on how much of the existing-personality list goes into the prompt.
const EXISTING_PERSONALITIES_CHARS: usize = 1000;

pub fn random_temperature() -> f32 {
    rand::rng().random_range(TEMPERATURE_MIN..TEMPERATURE_MAX)
}

/// Ask the utility model for a personality distinct from `existing`.
pub async fn generate_personality<P: LlmProvider + ?Sized>(
    utility: &P,
    existing: &[String],
    max_tokens: u32,
) -> Result<String, LlmError> {
    let others: String = existing
        .join("; ")
        .chars()
        .take(EXISTING_PERSONALITIES_CHARS)
        .collect();
    let request = CompletionRequest::persona(
        format!("{PERSONALITY_PROMPT}{others}"),
        "Describe the new bot's personality.",
        max_tokens,
        random_temperature(),
    );
    let reply = utility.complete(request).await?;
    let personality = reply.content.trim();
    if personality.is_empty() {
        return Err(LlmError::parse("empty personality", &reply.content));
    }
    Ok(personality.to_owned())
}

/// System prompt for a bot's conversational turn.
pub fn response_system_prompt(bot: &BotSnapshot, sender: &str, context: &[ChatMessage], mentioned: bool) -> String {
    let mut prompt = String::with_capacity(1024);
    prompt.push_str(&format!(
        "You are a chatbot named {} with the following personality: {}. ",
        bot.name, bot.personality
    ));
    prompt.push_str(
        "Respond in a way that reflects this personality. Be sarcastic, make jokes, \
         and poke fun at the user or other bots when appropriate. Don't be overly helpful or polite. \
         Your responses should be reminiscent of IRC, Discord, or Reddit conversations. \
         Occasionally, initiate new topics or ask questions to keep the conversation going. ",
    );
    prompt.push_str(&format!("The message you're responding to was sent by {sender}. "));
    prompt.push_str(&format!("Your recent memory is: {}. ", bot.memory));
    prompt.push_str("Here's the recent conversation context:\n");
    for line in context {
        prompt.push_str(&format!("{}: {}\n", line.display_name, line.content));
    }
    prompt.push_str(&format!(
        "You {} directly mentioned in this message. ",
        if mentioned { "were" } else { "were not" }
    ));
    prompt.push_str("If the conversation seems to be dying down, introduce a new topic or ask a question.");
    prompt
}

/// Yes/no consult asking whether `bot` should answer `message`.
pub fn consult_request(bot: &BotSnapshot, message: &str, temperature: f32) -> CompletionRequest {
    let system = format!(
        "You are an AI assistant that determines if a bot with a given personality should respond to a message. \
         The bot's name is {}. The bot's personality is: {}. The bot's recent memory is: {}. \
         Consider the context and the bot's personality. \
         Respond with only 'yes' if the bot should respond, or 'no' if it shouldn't. \
         Aim for natural conversation flow and avoid having the bot respond to every message.",
        bot.name, bot.personality, bot.memory
    );
    CompletionRequest::persona(system, format!("Should the bot respond to this message: {message}"), 1, temperature)
}

/// A consult answer counts as yes only when it is exactly "yes", ignoring case and padding.
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}

/// First-person line a bot injects into the room on its own initiative.
pub fn autonomous_message(name: &str, personality: &str) -> String {
    format!("As {name}, I want to say something based on my personality: {personality}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatter_llm::{MockProvider, ProviderKind};

    fn snapshot() -> BotSnapshot {
        BotSnapshot {
            id: uuid::Uuid::nil(),
            name: "Zed".into(),
            provider: ProviderKind::Anthropic,
            personality: "a cynical sysadmin".into(),
            temperature: 0.8,
            memory: "Last interaction: hi...".into(),
        }
    }

    #[test]
    fn response_prompt_carries_context_and_mention() {
        let context = vec![ChatMessage::user("alice", "hey all"), ChatMessage::assistant("Bob", "yo")];
        let prompt = response_system_prompt(&snapshot(), "alice", &context, true);
        assert!(prompt.contains("named Zed"));
        assert!(prompt.contains("a cynical sysadmin"));
        assert!(prompt.contains("sent by alice"));
        assert!(prompt.contains("Last interaction: hi..."));
        assert!(prompt.contains("alice: hey all\nBob: yo\n"));
        assert!(prompt.contains("You were directly mentioned"));

        let prompt = response_system_prompt(&snapshot(), "alice", &[], false);
        assert!(prompt.contains("You were not directly mentioned"));
    }

    #[test]
    fn consult_is_one_token() {
        let req = consult_request(&snapshot(), "anyone up?", 0.7);
        assert_eq!(req.max_tokens, 1);
        assert_eq!(req.user_prompt(), Some("Should the bot respond to this message: anyone up?"));
        assert!(req.system_prompt().unwrap().contains("The bot's name is Zed"));
    }

    #[test]
    fn affirmative_answers() {
        assert!(is_affirmative("yes"));
        assert!(is_affirmative(" YES\n"));
        assert!(!is_affirmative("no"));
        assert!(!is_affirmative("yes."));
        assert!(!is_affirmative(""));
    }

    #[test]
    fn temperatures_stay_in_range() {
        for _ in 0..1000 {
            let t = random_temperature();
            assert!((TEMPERATURE_MIN..TEMPERATURE_MAX).contains(&t));
        }
    }

    #[test]
    fn autonomous_line_is_first_person() {
        assert_eq!(
            autonomous_message("Zed", "grumpy"),
            "As Zed, I want to say something based on my personality: grumpy"
        );
    }

    #[tokio::test]
    async fn personality_comes_from_utility_model() {
        let utility = MockProvider::new("  A meme-loving optimist.\n");
        let p = generate_personality(&utility, &["a cynic".into()], 50).await.unwrap();
        assert_eq!(p, "A meme-loving optimist.");
        assert_eq!(utility.calls(), 1);
    }

    #[tokio::test]
    async fn blank_personality_is_an_error() {
        let utility = MockProvider::new("   ");
        assert!(generate_personality(&utility, &[], 50).await.unwrap_err().is_parse());
    }
}
