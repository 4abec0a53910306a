//! Quick filter and skip-list
//!
//! A cheap pre-screen deciding whether a message is worth an oracle call.
//! It favours precision: missing a message here is fine, the oracle is the
//! authority on moderation.

/// Messages shorter than this are never evaluated
const MIN_LENGTH: usize = 5;
/// Caps detection only applies to messages longer than this
const CAPS_MIN_LENGTH: usize = 10;
const CAPS_RATIO: f64 = 0.7;
const REPEAT_RUN: usize = 5;

const LINK_MARKERS: [&str; 2] = ["http://", "https://"];
const MASS_MENTIONS: [&str; 2] = ["@everyone", "@here"];
/// Prefixes of custom emote tokens (`<:name:id>`, `<a:name:id>`, `:shortcode:`)
const EMOTE_PREFIXES: [&str; 3] = ["<:", "<a:", ":"];

/// Well-known chat bots that are never moderated
pub const KNOWN_BOTS: [&str; 8] = [
    "nightbot",
    "streamelements",
    "streamlabs",
    "moobot",
    "fossabot",
    "wizebot",
    "botisimo",
    "sery_bot",
];

/// Whether a message should be sent to the oracle
#[must_use]
pub fn needs_evaluation(text: &str) -> bool {
    let length = text.chars().count();
    if length < MIN_LENGTH {
        return false;
    }

    let lower = text.to_lowercase();
    if LINK_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return true;
    }
    if MASS_MENTIONS.iter().any(|marker| lower.contains(marker)) {
        return true;
    }
    if length > CAPS_MIN_LENGTH && caps_ratio(text, length) > CAPS_RATIO {
        return true;
    }
    // emote ids repeat digits, a lone emote is not spam
    !is_single_emote(text) && has_repeated_run(text, REPEAT_RUN)
}

fn is_single_emote(text: &str) -> bool {
    !text.contains(char::is_whitespace)
        && EMOTE_PREFIXES.iter().any(|prefix| text.starts_with(prefix))
}

/// Share of uppercase characters over the whole message
fn caps_ratio(text: &str, length: usize) -> f64 {
    let upper = text.chars().filter(|c| c.is_uppercase()).count();
    #[allow(clippy::cast_precision_loss)]
    let ratio = upper as f64 / length as f64;
    ratio
}

fn has_repeated_run(text: &str, run: usize) -> bool {
    let mut previous = None;
    let mut count = 0;
    for c in text.chars() {
        if Some(c) == previous {
            count += 1;
        } else {
            previous = Some(c);
            count = 1;
        }
        if count >= run {
            return true;
        }
    }
    false
}

/// Identities exempt from moderation: known bots, the channel owner and any
/// configured extras
#[derive(Debug, Clone, Default)]
pub struct SkipList {
    names: Vec<String>,
}

impl SkipList {
    /// Skip-list with the known bots plus `extra` names
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = KNOWN_BOTS
            .iter()
            .map(|name| (*name).to_string())
            .chain(extra.into_iter().map(|name| name.as_ref().to_lowercase()))
            .collect();
        Self { names }
    }

    /// Case-insensitive membership test
    #[must_use]
    pub fn should_skip_user(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.names.iter().any(|entry| *entry == name)
    }
}

/// Membership test against the known-bot list only
#[must_use]
pub fn should_skip_user(name: &str) -> bool {
    let name = name.to_lowercase();
    KNOWN_BOTS.iter().any(|bot| *bot == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_messages_never_evaluated() {
        for text in ["hi", "AAAA", "!!!!", "@her", "http", "", "ÄÄÄÄ"] {
            assert!(!needs_evaluation(text), "{text:?} should be skipped");
        }
    }

    #[test]
    fn test_links_and_mentions() {
        assert!(needs_evaluation("check http://spam.example"));
        assert!(needs_evaluation("free stuff at HTTPS://x.io"));
        assert!(needs_evaluation("hey @everyone look"));
        assert!(needs_evaluation("@here now"));
        assert!(!needs_evaluation("good game everyone"));
    }

    #[test]
    fn test_caps_ratio() {
        assert!(needs_evaluation("AAAAAAAAAAAAAAAAAAAA"));
        assert!(needs_evaluation("WHY IS THIS SO LOUD"));
        assert!(needs_evaluation("ABCDEFGHIJK"));
        // ten characters is not long enough
        assert!(!needs_evaluation("ABCDEFGHIJ"));
        assert!(!needs_evaluation("Hello There Friend"));
    }

    #[test]
    fn test_repeated_characters() {
        assert!(needs_evaluation("helloooooo everyone"));
        assert!(needs_evaluation("aaaaa"));
        assert!(!needs_evaluation("aaaa"));
        assert!(needs_evaluation("wait!!!!! what"));
        assert!(!needs_evaluation("bookkeeper"));
    }

    #[test]
    fn test_emotes_pass() {
        assert!(!needs_evaluation("<:KEKW:123456>"));
        assert!(!needs_evaluation("<:KEKW:1111111>"));
        assert!(needs_evaluation("wow <:KEKW:1111111>"));
        assert!(!needs_evaluation("lol <:OMEGALUL:998877> <:PEPE:11>"));
        assert!(!needs_evaluation(":pogchamp:"));
    }

    #[test]
    fn test_caps_inside_emote_tokens_still_count() {
        // 34 characters, 26 of them uppercase
        let text = "hi <:ABCDEFGHIJKLMNOPQRSTUVWXYZ:1>";
        assert!(caps_ratio(text, text.chars().count()) > CAPS_RATIO);
        assert!(needs_evaluation(text));
        // the caps rule holds for a lone emote too
        assert!(needs_evaluation("<:OMEGALULOMEGALUL:1>"));
    }

    #[test]
    fn test_ordinary_chat_skipped() {
        assert!(!needs_evaluation("good game, well played"));
        assert!(!needs_evaluation("what keyboard is that?"));
    }

    #[test]
    fn test_skip_user_case_insensitive() {
        assert!(should_skip_user("Nightbot"));
        assert!(should_skip_user("STREAMELEMENTS"));
        assert!(!should_skip_user("nightbot2"));
        assert!(!should_skip_user("chatter42"));

        let skip = SkipList::new(["TheStreamer"]);
        assert!(skip.should_skip_user("thestreamer"));
        assert!(skip.should_skip_user("THESTREAMER"));
        assert!(skip.should_skip_user("moobot"));
        assert!(!skip.should_skip_user("chatter42"));
    }

    #[test]
    fn test_skip_user_non_ascii_names() {
        let skip = SkipList::new(["ÅsaStreams", "ÉLODIE"]);
        assert!(skip.should_skip_user("åsastreams"));
        assert!(skip.should_skip_user("ÅSASTREAMS"));
        assert!(skip.should_skip_user("élodie"));
        assert!(skip.should_skip_user("Élodie"));
        assert!(!skip.should_skip_user("elodie"));
    }
}
