//! Emoji stripping.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

// Keycaps, flag pairs, then pictographs with their modifier/ZWJ tails.
const EMOJI_PATTERN: &str = concat!(
    r"[#*0-9]\x{FE0F}?\x{20E3}",
    r"|[\x{1F1E6}-\x{1F1FF}]{1,2}",
    r"|\p{Extended_Pictographic}[\x{FE0E}\x{FE0F}\x{1F3FB}-\x{1F3FF}\x{E0020}-\x{E007F}]*",
    r"(?:\x{200D}\p{Extended_Pictographic}[\x{FE0E}\x{FE0F}\x{1F3FB}-\x{1F3FF}]*)*",
);

fn emoji_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(EMOJI_PATTERN).expect("emoji pattern is valid"))
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// Whether `text` contains at least one emoji.
#[must_use]
pub fn contains_emoji(text: &str) -> bool {
    emoji_regex().is_match(text)
}

/// Replace every emoji with a space, collapse whitespace runs and trim.
///
/// Text without emoji is returned untouched, which makes the operation
/// idempotent.
#[must_use]
pub fn strip_emojis(text: &str) -> Cow<'_, str> {
    if !contains_emoji(text) {
        return Cow::Borrowed(text);
    }
    let replaced = emoji_regex().replace_all(text, " ");
    let collapsed = whitespace_regex().replace_all(&replaced, " ");
    Cow::Owned(collapsed.trim().to_string())
}
