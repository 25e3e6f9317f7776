use super::normalize_text;
use super::traits::TextMatcher;
use crate::config::RulesConfig;
use aho_corasick::AhoCorasick;
use anyhow::{Context, Result};

/// Multi-pattern keyword matcher over normalized text.
///
/// Four automatons are built from the configured term lists, each pattern
/// normalized with the same function the scanned text goes through. The flat
/// list and the gated lists are kept separate on purpose: flat terms are
/// tuned for URLs and search queries where a bare substring is a cheap,
/// reliable signal, while the gated lists assume prose and require
/// co-occurrence to avoid blocking a topical mention without reading intent.
pub struct KeywordMatcher {
    flat: AhoCorasick,
    flat_terms: Vec<String>,
    roots: AhoCorasick,
    root_terms: Vec<String>,
    intent: AhoCorasick,
    combos: AhoCorasick,
    combo_terms: Vec<String>,
}

fn normalize_terms(raw: &[String]) -> Vec<String> {
    let mut terms: Vec<String> = raw
        .iter()
        .map(|t| normalize_text(t))
        .filter(|t| !t.is_empty())
        .collect();
    terms.sort();
    terms.dedup();
    terms
}

impl KeywordMatcher {
    pub fn from_rules(rules: &RulesConfig) -> Result<Self> {
        let flat_terms = normalize_terms(&rules.keywords);
        let root_terms = normalize_terms(&rules.content_roots);
        let intent_terms = normalize_terms(&rules.intent_words);
        let combo_terms = normalize_terms(&rules.combo_phrases);

        Ok(Self {
            flat: AhoCorasick::new(&flat_terms).context("Failed to build flat automaton")?,
            roots: AhoCorasick::new(&root_terms).context("Failed to build roots automaton")?,
            intent: AhoCorasick::new(&intent_terms).context("Failed to build intent automaton")?,
            combos: AhoCorasick::new(&combo_terms).context("Failed to build combo automaton")?,
            flat_terms,
            root_terms,
            combo_terms,
        })
    }
}

impl TextMatcher for KeywordMatcher {
    fn check_flat(&self, text: &str) -> Option<String> {
        let t = normalize_text(text);
        self.flat
            .find(&t)
            .map(|m| self.flat_terms[m.pattern().as_usize()].clone())
    }

    fn check_gated(&self, text: &str) -> Option<String> {
        let t = normalize_text(text);

        // Combo phrases carry both topic and intent on their own.
        if let Some(m) = self.combos.find(&t) {
            return Some(self.combo_terms[m.pattern().as_usize()].clone());
        }

        let root = self.roots.find(&t)?;
        if self.intent.is_match(&t) {
            return Some(self.root_terms[root.pattern().as_usize()].clone());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> KeywordMatcher {
        KeywordMatcher::from_rules(&RulesConfig::default()).unwrap()
    }

    #[test]
    fn test_flat_matches_keyword_substrings() {
        let m = matcher();
        assert!(m.check_flat("readmanga-chapter-1").is_some());
        assert!(m.check_flat("https://mangadex.org/title/1").is_some());
        assert_eq!(m.check_flat("example-news-today"), None);
    }

    #[test]
    fn test_flat_defeats_evasion() {
        let m = matcher();
        assert!(m.check_flat("m a n g a").is_some());
        assert!(m.check_flat("m4ng4").is_some());
        assert!(m.check_flat("mángá").is_some());
        assert!(m.check_flat("w-e-b-t-0-0-n").is_some());
    }

    #[test]
    fn test_flat_never_returns_safe_only_none() {
        let m = matcher();
        // A clean string is inconclusive, not an affirmative allow.
        assert_eq!(m.check_flat("weather forecast tomorrow"), None);
    }

    #[test]
    fn test_gated_requires_root_and_intent() {
        let m = matcher();
        // Root alone: a topical mention without consumption intent.
        assert_eq!(m.check_gated("anime"), None);
        // Root plus intent.
        assert!(m.check_gated("read anime online").is_some());
        // Intent alone.
        assert_eq!(m.check_gated("latest news online"), None);
    }

    #[test]
    fn test_gated_combo_phrase_standalone() {
        let m = matcher();
        assert_eq!(m.check_gated("readmanhwa"), Some("readmanhwa".into()));
        assert!(m.check_gated("raw chapter 12").is_some());
    }

    #[test]
    fn test_rebuilt_with_custom_terms() {
        let rules = RulesConfig {
            keywords: vec!["Gamble Site".to_string()],
            content_roots: vec!["casino".to_string()],
            intent_words: vec!["play".to_string()],
            combo_phrases: vec![],
        };
        let m = KeywordMatcher::from_rules(&rules).unwrap();
        assert_eq!(m.check_flat("gamble-site.com"), Some("gamblesite".into()));
        assert_eq!(m.check_flat("mangadex.org"), None);
        assert!(m.check_gated("play at our casino").is_some());
        assert_eq!(m.check_gated("casino history essay"), None);
    }
}
