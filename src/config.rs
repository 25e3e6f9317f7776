use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_block_page")]
    pub block_page: String,

    #[serde(default = "default_video_platform_host")]
    pub video_platform_host: String,

    #[serde(default = "default_baseline_safe")]
    pub baseline_safe: Vec<String>,

    #[serde(default = "default_search_engines")]
    pub search_engines: Vec<SearchEngineConfig>,

    #[serde(default)]
    pub rules: RulesConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub guard: GuardConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub stats: StatsConfig,
}

/// One recognized search-results surface. The query parameter is extracted
/// from URLs whose host contains `host_pattern` and whose path equals `path`.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchEngineConfig {
    pub host_pattern: String,
    pub path: String,
    pub param: String,
    /// Whether queries from this surface may be kept as weak context for
    /// later website classifications.
    #[serde(default = "default_true")]
    pub reusable_context: bool,
    /// Whether this is the video platform's own search surface.
    #[serde(default)]
    pub video_search: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RulesConfig {
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    #[serde(default = "default_content_roots")]
    pub content_roots: Vec<String>,
    #[serde(default = "default_intent_words")]
    pub intent_words: Vec<String>,
    #[serde(default = "default_combo_phrases")]
    pub combo_phrases: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
    #[serde(default = "default_read_cache_capacity")]
    pub read_cache_capacity: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClassifierConfig {
    #[serde(default = "default_classifier_base_url")]
    pub base_url: String,
    #[serde(default = "default_classifier_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GuardConfig {
    #[serde(default = "default_debounce_window_secs")]
    pub debounce_window_secs: u64,
    #[serde(default = "default_debounce_max_age_secs")]
    pub debounce_max_age_secs: u64,
    #[serde(default = "default_maintenance_interval_secs")]
    pub maintenance_interval_secs: u64,
    #[serde(default = "default_search_context_ttl_secs")]
    pub search_context_ttl_secs: u64,
    #[serde(default = "default_page_text_limit")]
    pub page_text_limit: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default = "default_true")]
    pub log_blocked: bool,
    #[serde(default = "default_true")]
    pub log_all_decisions: bool,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_decision_log_sinks")]
    pub decision_log_sinks: Vec<String>,
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
    #[serde(default = "default_sqlite_retention_hours")]
    pub sqlite_retention_hours: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StatsConfig {
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default = "default_stats_log_interval")]
    pub log_interval_seconds: u64,
}

// Defaults
fn default_true() -> bool {
    true
}
fn default_block_page() -> String {
    "http://localhost:8080/block.html".to_string()
}
fn default_video_platform_host() -> String {
    "youtube.com".to_string()
}
fn default_baseline_safe() -> Vec<String> {
    [
        "google.com",
        "docs.google.com",
        "mail.google.com",
        "drive.google.com",
        "accounts.google.com",
        "youtube.com",
        "github.com",
        "stackoverflow.com",
        "linkedin.com",
        "outlook.office.com",
        "login.microsoftonline.com",
        "chatgpt.com",
        "netflix.com",
        "localhost",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_search_engines() -> Vec<SearchEngineConfig> {
    vec![
        SearchEngineConfig {
            host_pattern: "google.".to_string(),
            path: "/search".to_string(),
            param: "q".to_string(),
            reusable_context: true,
            video_search: false,
        },
        SearchEngineConfig {
            host_pattern: "bing.com".to_string(),
            path: "/search".to_string(),
            param: "q".to_string(),
            reusable_context: true,
            video_search: false,
        },
        SearchEngineConfig {
            host_pattern: "youtube.com".to_string(),
            path: "/results".to_string(),
            param: "search_query".to_string(),
            reusable_context: false,
            video_search: true,
        },
    ]
}
fn default_keywords() -> Vec<String> {
    [
        "manga",
        "manhwa",
        "manhua",
        "webtoon",
        "scanlation",
        "scans",
        "chapter",
        "read manga",
        "read manhwa",
        "toon",
        "anime",
        "mangadex",
        "mangakakalot",
        "manganato",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_content_roots() -> Vec<String> {
    [
        "manga",
        "manhwa",
        "manhua",
        "webtoon",
        "doujin",
        "doujinshi",
        "scanlation",
        "scanlator",
        "scanlat",
        "hentai",
        "ecchi",
        "nsfw",
        "r18",
        "18plus",
        "anime",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_intent_words() -> Vec<String> {
    [
        "read",
        "chapter",
        "chapters",
        "online",
        "free",
        "raw",
        "translated",
        "scan",
        "scans",
        "viewer",
        "full",
        "latest",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_combo_phrases() -> Vec<String> {
    [
        "readmanga",
        "readmanhwa",
        "readmanhua",
        "readwebtoon",
        "mangaread",
        "manhwaread",
        "webtoonread",
        "rawchapter",
        "rawchapters",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_store_path() -> String {
    "verdicts.json".to_string()
}
fn default_read_cache_capacity() -> u64 {
    10000
}
fn default_classifier_base_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_classifier_timeout_ms() -> u64 {
    8000
}
fn default_debounce_window_secs() -> u64 {
    3
}
fn default_debounce_max_age_secs() -> u64 {
    30
}
fn default_maintenance_interval_secs() -> u64 {
    30
}
fn default_search_context_ttl_secs() -> u64 {
    300
}
fn default_page_text_limit() -> usize {
    4000
}
fn default_api_port() -> u16 {
    8081
}
fn default_log_format() -> String {
    "text".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_decision_log_sinks() -> Vec<String> {
    vec!["console".to_string()]
}
fn default_sqlite_path() -> String {
    "navguard.db".to_string()
}
fn default_sqlite_retention_hours() -> u64 {
    168 // 7 days
}
fn default_stats_log_interval() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_page: default_block_page(),
            video_platform_host: default_video_platform_host(),
            baseline_safe: default_baseline_safe(),
            search_engines: default_search_engines(),
            rules: RulesConfig::default(),
            store: StoreConfig::default(),
            classifier: ClassifierConfig::default(),
            guard: GuardConfig::default(),
            api: ApiConfig::default(),
            logging: LoggingConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            content_roots: default_content_roots(),
            intent_words: default_intent_words(),
            combo_phrases: default_combo_phrases(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            read_cache_capacity: default_read_cache_capacity(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: default_classifier_base_url(),
            timeout_ms: default_classifier_timeout_ms(),
        }
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            debounce_window_secs: default_debounce_window_secs(),
            debounce_max_age_secs: default_debounce_max_age_secs(),
            maintenance_interval_secs: default_maintenance_interval_secs(),
            search_context_ttl_secs: default_search_context_ttl_secs(),
            page_text_limit: default_page_text_limit(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enable: true,
            port: default_api_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable: true,
            log_blocked: true,
            log_all_decisions: true,
            format: default_log_format(),
            level: default_log_level(),
            decision_log_sinks: default_decision_log_sinks(),
            sqlite_path: default_sqlite_path(),
            sqlite_retention_hours: default_sqlite_retention_hours(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enable: true,
            log_interval_seconds: default_stats_log_interval(),
        }
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        let config: Config = toml::from_str(&contents).context("Failed to parse config TOML")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.classifier.base_url, "http://localhost:3000");
        assert_eq!(config.guard.debounce_window_secs, 3);
        assert_eq!(config.search_engines.len(), 3);
        assert!(config.rules.keywords.contains(&"manga".to_string()));
    }

    #[test]
    fn test_partial_override() {
        let config: Config = toml::from_str(
            r#"
            block_page = "http://localhost:9999/stop.html"

            [classifier]
            timeout_ms = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.block_page, "http://localhost:9999/stop.html");
        assert_eq!(config.classifier.timeout_ms, 500);
        // untouched sections keep their defaults
        assert_eq!(config.store.path, "verdicts.json");
    }
}
