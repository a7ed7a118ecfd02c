//! Word tokenizer used for both documents and queries.

use std::sync::OnceLock;

use regex::Regex;

/// One or more word characters, optionally joined to a second run by a
/// single apostrophe (`don't` stays whole).
const TOKEN_PATTERN: &str = r"\w+(?:'\w+)?";

fn token_regex() -> &'static Regex {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    TOKEN_RE.get_or_init(|| Regex::new(TOKEN_PATTERN).expect("token pattern is valid"))
}

/// Maps typographic quotes to their ASCII forms.
pub fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|ch| match ch {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            other => other,
        })
        .collect()
}

/// Splits raw text into lowercase tokens, in order of appearance.
///
/// Never fails; punctuation-only or empty input yields no tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = normalize_quotes(&text.to_lowercase());
    token_regex()
        .find_iter(&normalized)
        .map(|m| m.as_str().to_string())
        .collect()
}
