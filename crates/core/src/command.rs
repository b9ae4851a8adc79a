use chatter_llm::ProviderKind;

use crate::bots::registry::ADDBOT_USAGE;
use crate::error::RoomError;

pub const KICK_USAGE: &str = "/kick <botname|all>";
pub const NICK_USAGE: &str = "/nick <newname>";
pub const WHOIS_USAGE: &str = "/whois <botname>";
pub const COMMANDS_USAGE: &str = "/addbot <openai|anthropic> <name> | /kick <botname|all> | /nick <newname> | /whois <botname> | /quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KickTarget {
    All,
    Bot(String),
}

/// A slash command typed into the input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddBot { provider: ProviderKind, name: String },
    Kick(KickTarget),
    Nick(String),
    Whois(String),
    Quit,
}

impl Command {
    /// Parse a line starting with `/`. Arguments are single whitespace-separated
    /// words; anything after the last expected word is ignored.
    pub fn parse(line: &str) -> Result<Self, RoomError> {
        let mut words = line.split_whitespace();
        let head = words.next().unwrap_or_default();
        let invalid = |usage| RoomError::validation("Invalid command format.", usage);

        match head {
            "/addbot" => {
                let (Some(provider), Some(name)) = (words.next(), words.next()) else {
                    return Err(invalid(ADDBOT_USAGE));
                };
                let provider = provider.parse().map_err(|_| invalid(ADDBOT_USAGE))?;
                Ok(Self::AddBot { provider, name: name.to_owned() })
            }
            "/kick" => match words.next() {
                Some("all") => Ok(Self::Kick(KickTarget::All)),
                Some(name) => Ok(Self::Kick(KickTarget::Bot(name.to_owned()))),
                None => Err(invalid(KICK_USAGE)),
            },
            "/nick" => words
                .next()
                .map(|n| Self::Nick(n.to_owned()))
                .ok_or_else(|| invalid(NICK_USAGE)),
            "/whois" => words
                .next()
                .map(|n| Self::Whois(n.to_owned()))
                .ok_or_else(|| invalid(WHOIS_USAGE)),
            "/quit" => Ok(Self::Quit),
            _ => Err(RoomError::validation("Unknown command.", COMMANDS_USAGE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_command() {
        assert_eq!(
            Command::parse("/addbot anthropic Zed").unwrap(),
            Command::AddBot { provider: ProviderKind::Anthropic, name: "Zed".into() }
        );
        assert_eq!(Command::parse("/kick all").unwrap(), Command::Kick(KickTarget::All));
        assert_eq!(Command::parse("/kick  Zed ").unwrap(), Command::Kick(KickTarget::Bot("Zed".into())));
        assert_eq!(Command::parse("/nick neo").unwrap(), Command::Nick("neo".into()));
        assert_eq!(Command::parse("/whois Zed").unwrap(), Command::Whois("Zed".into()));
        assert_eq!(Command::parse("/quit").unwrap(), Command::Quit);
    }

    #[test]
    fn malformed_commands_carry_usage() {
        let err = Command::parse("/addbot gemini Zed").unwrap_err();
        assert_eq!(err.to_string(), format!("Invalid command format. Usage: {ADDBOT_USAGE}"));
        assert!(matches!(Command::parse("/addbot openai"), Err(RoomError::Validation { usage, .. }) if usage == ADDBOT_USAGE));
        assert!(matches!(Command::parse("/kick"), Err(RoomError::Validation { usage, .. }) if usage == KICK_USAGE));
        assert!(matches!(Command::parse("/nick"), Err(RoomError::Validation { usage, .. }) if usage == NICK_USAGE));
        assert!(matches!(Command::parse("/whois"), Err(RoomError::Validation { usage, .. }) if usage == WHOIS_USAGE));
    }

    #[test]
    fn unknown_command() {
        let err = Command::parse("/dance").unwrap_err();
        assert!(err.to_string().starts_with("Unknown command."));
    }

    #[test]
    fn extra_words_are_ignored() {
        assert_eq!(Command::parse("/nick neo the one").unwrap(), Command::Nick("neo".into()));
    }
}
