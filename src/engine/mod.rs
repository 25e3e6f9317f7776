mod manager;
mod matcher;
mod traits;

pub use manager::RuleManager;
pub use matcher::KeywordMatcher;
pub use traits::{MatcherSource, TextMatcher};

use unicode_normalization::UnicodeNormalization;

/// Normalizes text for keyword matching.
///
/// Lowercase, Unicode compatibility decomposition, strip everything that is
/// not ASCII alphanumeric (this drops decomposed diacritics along with
/// spacing and punctuation), then undo the common leetspeak digit
/// substitutions. Defeats spacing/punctuation/diacritic/leet evasion; both
/// patterns and scanned text go through the same function.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .nfkd()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| match c {
            '0' => 'o',
            '1' => 'i',
            '3' => 'e',
            '4' => 'a',
            '5' => 's',
            '7' => 't',
            _ => c,
        })
        .collect()
}
