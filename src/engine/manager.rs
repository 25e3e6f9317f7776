use super::matcher::KeywordMatcher;
use super::traits::{MatcherSource, TextMatcher};
use crate::config::{Config, RulesConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Builds the active matcher from the rules section of the config, and
/// rebuilds it on demand (scheduled reload or `/api/refresh`). When a config
/// file path is known the rules are re-read from disk so list edits take
/// effect without a restart; otherwise the in-memory rules are reused.
pub struct RuleManager {
    config_path: Option<PathBuf>,
    rules: RulesConfig,
}

impl RuleManager {
    pub fn new(config_path: Option<PathBuf>, rules: RulesConfig) -> Self {
        Self { config_path, rules }
    }

    async fn load_rules(&self) -> RulesConfig {
        match &self.config_path {
            Some(path) => match Config::load(path).await {
                Ok(config) => config.rules,
                Err(e) => {
                    warn!("Failed to reload rules from {:?}: {}", path, e);
                    self.rules.clone()
                }
            },
            None => self.rules.clone(),
        }
    }
}

#[async_trait::async_trait]
impl MatcherSource for RuleManager {
    async fn rebuild(&self) -> Arc<dyn TextMatcher> {
        let rules = self.load_rules().await;
        let matcher = KeywordMatcher::from_rules(&rules).unwrap_or_else(|e| {
            error!("Failed to build keyword matcher, using defaults: {}", e);
            KeywordMatcher::from_rules(&RulesConfig::default())
                .expect("default rules must build")
        });
        info!(
            "Keyword matcher built: {} flat, {} roots, {} intent, {} combos",
            rules.keywords.len(),
            rules.content_roots.len(),
            rules.intent_words.len(),
            rules.combo_phrases.len()
        );
        Arc::new(matcher)
    }
}
