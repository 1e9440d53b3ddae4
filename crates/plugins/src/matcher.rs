use bubbles_core::BotError;
use bubbles_slack::identity::BotIdentity;
use regex::Regex;

/// The forms that address the bot: `@username `, `<@USERID>`, a bare user
/// id, or the `!` shorthand. Leading whitespace is tolerated before any of
/// them.
fn address_alternation(identity: &BotIdentity) -> String {
    format!(
        r"@{name}\s+|<@{id}>\s*|{id}\s+|!",
        name = regex::escape(&identity.username),
        id = regex::escape(&identity.user_id),
    )
}

fn compile(pattern: &str) -> Result<Regex, BotError> {
    Regex::new(pattern)
        .map_err(|error| BotError::Internal(format!("invalid trigger pattern: {error}")))
}

/// Compiled relevance test for one plugin's trigger words. The keyword match
/// is case-insensitive, anchored at a word boundary, and consumes trailing
/// whitespace so stripping the prefix leaves only the arguments.
#[derive(Clone, Debug)]
pub struct TriggerPattern {
    regex: Regex,
}

impl TriggerPattern {
    pub fn compile(identity: &BotIdentity, trigger_words: &[&str]) -> Result<Self, BotError> {
        if trigger_words.is_empty() {
            return Err(BotError::Internal(
                "a plugin must declare at least one trigger word".to_owned(),
            ));
        }
        let words =
            trigger_words.iter().map(|word| regex::escape(word)).collect::<Vec<_>>().join("|");
        let pattern = format!(
            r"(?mi)^\s*(?:{address})({words})\b\s*",
            address = address_alternation(identity),
        );
        Ok(Self { regex: compile(&pattern)? })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Removes the address form and trigger word, returning the arguments.
    /// Text that does not match is returned unchanged.
    pub fn strip_prefix<'t>(&self, text: &'t str) -> &'t str {
        match self.regex.find(text) {
            Some(found) if found.start() == 0 => &text[found.end()..],
            _ => text,
        }
    }
}

/// Matches any message addressed to the bot, whatever follows the address.
/// The dispatcher uses this to tell "not for us" apart from "unknown
/// command".
#[derive(Clone, Debug)]
pub struct AddressPattern {
    regex: Regex,
}

impl AddressPattern {
    pub fn compile(identity: &BotIdentity) -> Result<Self, BotError> {
        let pattern =
            format!(r"(?mi)^\s*(?:{address})", address = address_alternation(identity));
        Ok(Self { regex: compile(&pattern)? })
    }

    pub fn is_addressed(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

#[cfg(test)]
mod tests {
    use bubbles_slack::identity::BotIdentity;

    use super::{AddressPattern, TriggerPattern};

    fn identity() -> BotIdentity {
        BotIdentity { user_id: "U123".to_owned(), username: "bubbles".to_owned() }
    }

    #[test]
    fn all_address_forms_match() {
        let pattern = TriggerPattern::compile(&identity(), &["ping"]).expect("compile");
        assert!(pattern.is_match("!ping"));
        assert!(pattern.is_match("@bubbles ping"));
        assert!(pattern.is_match("<@U123> ping"));
        assert!(pattern.is_match("U123 ping"));
        assert!(pattern.is_match("  @Bubbles PING"));
    }

    #[test]
    fn unaddressed_or_mid_sentence_text_does_not_match() {
        let pattern = TriggerPattern::compile(&identity(), &["ping"]).expect("compile");
        assert!(!pattern.is_match("ping"));
        assert!(!pattern.is_match("please !ping later"));
        assert!(!pattern.is_match("@bubbles pingpong"));
    }

    #[test]
    fn strip_prefix_leaves_only_arguments() {
        let pattern = TriggerPattern::compile(&identity(), &["vote"]).expect("compile");
        assert_eq!(pattern.strip_prefix("@bubbles vote abc"), "abc");
        assert_eq!(pattern.strip_prefix("!vote   abc def"), "abc def");
        assert_eq!(pattern.strip_prefix("no match here"), "no match here");
    }

    #[test]
    fn word_boundary_separates_colliding_triggers() {
        let vote = TriggerPattern::compile(&identity(), &["vote"]).expect("compile");
        let voting = TriggerPattern::compile(&identity(), &["voting"]).expect("compile");
        assert!(vote.is_match("@bubbles vote abc"));
        assert!(!vote.is_match("@bubbles voting abc"));
        assert!(voting.is_match("@bubbles voting abc"));
    }

    #[test]
    fn empty_trigger_words_are_rejected() {
        assert!(TriggerPattern::compile(&identity(), &[]).is_err());
    }

    #[test]
    fn address_pattern_detects_bot_directed_text() {
        let pattern = AddressPattern::compile(&identity()).expect("compile");
        assert!(pattern.is_addressed("@bubbles quux"));
        assert!(pattern.is_addressed("!anything"));
        assert!(pattern.is_addressed("<@U123> hello"));
        assert!(!pattern.is_addressed("just chatting"));
    }
}
