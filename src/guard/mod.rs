pub mod state;
pub mod types;

pub use state::GuardState;
pub use types::{Decision, NavTransition, NavigationEvent, PageSignals};

use crate::cache::VerdictCache;
use crate::classifier::{RemoteClassifier, VIDEO_SEARCH_PREFIX};
use crate::config::Config;
use crate::debounce::RedirectDebouncer;
use crate::domain::normalize_domain;
use crate::engine::TextMatcher;
use crate::logger::{DecisionAction, DecisionLogEntry, DecisionLogger, DecisionStage, DecisionTier};
use crate::search::{match_search_surface, SearchContext, SearchHit};
use crate::stats::StatsCollector;
use crate::verdict::{StoredVerdict, Verdict};
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use url::Url;

/// The per-event decision state machine.
///
/// Composes every tier of the pipeline: entry guards, search-surface check,
/// cached-verdict lookup, keyword rules, remote classification, cache
/// write-back, and the debounced redirect. Each handler is an independent
/// async task; overlapping events for the same tab are expected and are
/// tolerated by the debouncer plus the cache's read-merge-write discipline.
pub struct NavigationGuard {
    config: Config,
    stats: Arc<StatsCollector>,
    logger: Arc<DecisionLogger>,
    matcher: Arc<ArcSwap<Arc<dyn TextMatcher>>>,
    classifier: Arc<dyn RemoteClassifier>,
    cache: Arc<VerdictCache>,
    context: SearchContext,
    debouncer: Arc<RedirectDebouncer>,
    state: GuardState,
}

impl NavigationGuard {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        stats: Arc<StatsCollector>,
        logger: Arc<DecisionLogger>,
        matcher: Arc<dyn TextMatcher>,
        classifier: Arc<dyn RemoteClassifier>,
        cache: Arc<VerdictCache>,
        debouncer: Arc<RedirectDebouncer>,
        state: GuardState,
    ) -> Self {
        let context = SearchContext::new(Duration::from_secs(config.guard.search_context_ttl_secs));
        Self {
            config,
            stats,
            logger,
            matcher: Arc::new(ArcSwap::new(Arc::new(matcher))),
            classifier,
            cache,
            context,
            debouncer,
            state,
        }
    }

    pub async fn update_rules(&self, new_matcher: Arc<dyn TextMatcher>) {
        info!("Updating active keyword rules...");
        self.matcher.store(Arc::new(new_matcher));
        info!("Active keyword rules updated.");
    }

    pub fn cache(&self) -> Arc<VerdictCache> {
        self.cache.clone()
    }

    /// Periodic housekeeping: prune stale debounce entries, drop expired
    /// search context.
    pub fn run_maintenance(&self) {
        self.debouncer
            .prune(Duration::from_secs(self.config.guard.debounce_max_age_secs));
        self.context.clear_expired();
    }

    fn is_video_platform(&self, host: &str) -> bool {
        let platform = &self.config.video_platform_host;
        host == platform || host.ends_with(&format!(".{}", platform))
    }

    /// Single ingress for all three navigation-lifecycle hooks.
    pub async fn handle_navigation(&self, event: &NavigationEvent) -> Decision {
        self.stats.inc_events();

        // Entry guards: only top-level frames of real tabs, and never our
        // own block page (a redirect echo must not re-enter the pipeline).
        if event.frame_id != 0
            || event.tab_id < 0
            || event.url.starts_with(&self.config.block_page)
        {
            self.stats.inc_ignored();
            return Decision::Ignored;
        }
        let Ok(url) = Url::parse(&event.url) else {
            self.stats.inc_ignored();
            return Decision::Ignored;
        };
        if !matches!(url.scheme(), "http" | "https") {
            self.stats.inc_ignored();
            return Decision::Ignored;
        }
        if !self.state.is_blocking_active() {
            self.stats.inc_allowed("");
            return Decision::Allowed;
        }

        let start = Instant::now();
        if let Some(hit) = match_search_surface(&url, &self.config.search_engines) {
            self.check_search(event.tab_id, &url, hit, start).await
        } else {
            self.check_site(event.tab_id, &url, start).await
        }
    }

    /// SEARCH_CHECK: the URL is a recognized search-results page.
    ///
    /// Search verdicts are never written to the cache: a blocked query says
    /// nothing about the search engine's domain.
    async fn check_search(
        &self,
        tab_id: i64,
        url: &Url,
        hit: SearchHit<'_>,
        start: Instant,
    ) -> Decision {
        let host = url.host_str().unwrap_or("").to_string();
        let query = hit.query;

        // Video-platform queries are judged under a separate policy and are
        // not reusable as context for later website classifications.
        if hit.engine.reusable_context && !query.is_empty() {
            self.context.record(&query);
        }

        if !query.is_empty() {
            if self.matcher.load().check_flat(&query).is_some() {
                self.stats.inc_rule_block();
                return self
                    .redirect(
                        tab_id,
                        url.as_str(),
                        &host,
                        DecisionStage::Search,
                        DecisionTier::Rules,
                        format!("Blocked search query: \"{}\"", query),
                        start,
                    )
                    .await;
            }

            let remote_query = if hit.engine.video_search {
                format!("{}{}", VIDEO_SEARCH_PREFIX, query)
            } else {
                query.clone()
            };
            if self.classify_search_remote(&remote_query).await == Verdict::Block {
                return self
                    .redirect(
                        tab_id,
                        url.as_str(),
                        &host,
                        DecisionStage::Search,
                        DecisionTier::Remote,
                        format!("Blocked search query: \"{}\"", query),
                        start,
                    )
                    .await;
            }
        }

        // Even an UNKNOWN verdict lets the results page render; a page the
        // user then visits is evaluated as a website in its own right.
        self.allow(
            tab_id,
            url.as_str(),
            &host,
            DecisionStage::Search,
            DecisionTier::Policy,
            start,
        )
        .await
    }

    /// SITE_CHECK: cache, then rules, then remote. The cache is
    /// authoritative once written; UNKNOWN from the remote tier allows
    /// without a cache write so the domain stays eligible for the cheaper
    /// in-page re-check.
    async fn check_site(&self, tab_id: i64, url: &Url, start: Instant) -> Decision {
        let host = url.host_str().unwrap_or("");

        // The video platform itself is exempt; only its search surface is
        // filtered.
        if self.is_video_platform(host) {
            return self
                .allow(
                    tab_id,
                    url.as_str(),
                    host,
                    DecisionStage::Site,
                    DecisionTier::Policy,
                    start,
                )
                .await;
        }

        let Some(domain) = normalize_domain(url.as_str()) else {
            // Not classifiable by domain; proceeds unclassified.
            self.stats.inc_allowed("");
            return Decision::Allowed;
        };

        match self.cache.get(&domain).await {
            Some(StoredVerdict::Safe) => {
                self.stats.inc_cache_hit();
                self.allow(
                    tab_id,
                    url.as_str(),
                    &domain,
                    DecisionStage::Site,
                    DecisionTier::Cache,
                    start,
                )
                .await
            }
            Some(StoredVerdict::Block) => {
                self.stats.inc_cache_hit();
                self.redirect(
                    tab_id,
                    url.as_str(),
                    &domain,
                    DecisionStage::Site,
                    DecisionTier::Cache,
                    "This site is blocked.".to_string(),
                    start,
                )
                .await
            }
            None => self.classify_site_fresh(tab_id, url, &domain, start).await,
        }
    }

    /// Rules-then-remote evaluation for a domain with no cached verdict.
    async fn classify_site_fresh(
        &self,
        tab_id: i64,
        url: &Url,
        domain: &str,
        start: Instant,
    ) -> Decision {
        let stage = DecisionStage::Site;
        if self.matcher.load().check_flat(url.as_str()).is_some() {
            self.stats.inc_rule_block();
            self.cache.set(domain, StoredVerdict::Block).await;
            return self
                .redirect(
                    tab_id,
                    url.as_str(),
                    domain,
                    stage,
                    DecisionTier::Rules,
                    "This page matches restricted keywords.".to_string(),
                    start,
                )
                .await;
        }

        let weak_context = self.context.current();
        match self
            .classify_site_remote(domain, url.as_str(), None, weak_context.as_deref())
            .await
        {
            Verdict::Block => {
                self.cache.set(domain, StoredVerdict::Block).await;
                self.redirect(
                    tab_id,
                    url.as_str(),
                    domain,
                    stage,
                    DecisionTier::Remote,
                    "Blocked by content classification.".to_string(),
                    start,
                )
                .await
            }
            Verdict::Safe => {
                self.cache.set(domain, StoredVerdict::Safe).await;
                self.allow(tab_id, url.as_str(), domain, stage, DecisionTier::Remote, start)
                    .await
            }
            // No write: the domain stays open for a later re-evaluation.
            Verdict::Unknown => {
                self.allow(tab_id, url.as_str(), domain, stage, DecisionTier::Policy, start)
                    .await
            }
        }
    }

    /// PAGE_CHECK: in-page signals for a domain the navigation tier left
    /// undecided. Flat rules on title and body first, then gated rules on
    /// the combined text, then the remote tier.
    pub async fn handle_page_signals(&self, signals: &PageSignals) -> Decision {
        self.stats.inc_events();

        if signals.tab_id < 0 || signals.url.starts_with(&self.config.block_page) {
            self.stats.inc_ignored();
            return Decision::Ignored;
        }
        let Ok(url) = Url::parse(&signals.url) else {
            self.stats.inc_ignored();
            return Decision::Ignored;
        };
        if !matches!(url.scheme(), "http" | "https") {
            self.stats.inc_ignored();
            return Decision::Ignored;
        }
        // Search surfaces and the video platform are handled (or exempted)
        // at navigation time; their page bodies are not evaluated.
        if match_search_surface(&url, &self.config.search_engines).is_some()
            || self.is_video_platform(url.host_str().unwrap_or(""))
        {
            self.stats.inc_ignored();
            return Decision::Ignored;
        }
        if !self.state.is_blocking_active() {
            self.stats.inc_allowed("");
            return Decision::Allowed;
        }

        let start = Instant::now();
        let Some(domain) = normalize_domain(signals.url.as_str()) else {
            self.stats.inc_allowed("");
            return Decision::Allowed;
        };

        match self.cache.get(&domain).await {
            Some(StoredVerdict::Safe) => {
                self.stats.inc_cache_hit();
                return self
                    .allow(
                        signals.tab_id,
                        url.as_str(),
                        &domain,
                        DecisionStage::Page,
                        DecisionTier::Cache,
                        start,
                    )
                    .await;
            }
            Some(StoredVerdict::Block) => {
                self.stats.inc_cache_hit();
                return self
                    .redirect(
                        signals.tab_id,
                        url.as_str(),
                        &domain,
                        DecisionStage::Page,
                        DecisionTier::Cache,
                        "This site is blocked.".to_string(),
                        start,
                    )
                    .await;
            }
            None => {}
        }

        let body: String = signals
            .text
            .chars()
            .take(self.config.guard.page_text_limit)
            .collect();

        let matcher = self.matcher.load();
        if matcher.check_flat(&signals.title).is_some() || matcher.check_flat(&body).is_some() {
            self.stats.inc_rule_block();
            self.cache.set(&domain, StoredVerdict::Block).await;
            return self
                .redirect(
                    signals.tab_id,
                    url.as_str(),
                    &domain,
                    DecisionStage::Page,
                    DecisionTier::Rules,
                    "This page looks like restricted content.".to_string(),
                    start,
                )
                .await;
        }

        let combined = format!(
            "{}\n{}\n{}",
            signals.title,
            signals.meta_description.as_deref().unwrap_or(""),
            body
        );
        if matcher.check_gated(&combined).is_some() {
            self.stats.inc_rule_block();
            self.cache.set(&domain, StoredVerdict::Block).await;
            return self
                .redirect(
                    signals.tab_id,
                    url.as_str(),
                    &domain,
                    DecisionStage::Page,
                    DecisionTier::Rules,
                    "This page looks like restricted content (title/body).".to_string(),
                    start,
                )
                .await;
        }
        drop(matcher);

        let weak_context = self.context.current();
        match self
            .classify_site_remote(
                &domain,
                url.as_str(),
                Some(&signals.title),
                weak_context.as_deref(),
            )
            .await
        {
            Verdict::Block => {
                self.cache.set(&domain, StoredVerdict::Block).await;
                self.redirect(
                    signals.tab_id,
                    url.as_str(),
                    &domain,
                    DecisionStage::Page,
                    DecisionTier::Remote,
                    "Blocked by content classification.".to_string(),
                    start,
                )
                .await
            }
            Verdict::Safe => {
                self.cache.set(&domain, StoredVerdict::Safe).await;
                self.allow(
                    signals.tab_id,
                    url.as_str(),
                    &domain,
                    DecisionStage::Page,
                    DecisionTier::Remote,
                    start,
                )
                .await
            }
            Verdict::Unknown => {
                self.allow(
                    signals.tab_id,
                    url.as_str(),
                    &domain,
                    DecisionStage::Page,
                    DecisionTier::Policy,
                    start,
                )
                .await
            }
        }
    }

    /// Manual override from the control API. Accepts a bare domain or a
    /// full URL; with a tab id the tab is redirected immediately.
    pub async fn block_domain(&self, target: &str, tab_id: Option<i64>) -> Option<String> {
        let domain = resolve_domain(target)?;
        self.cache.set(&domain, StoredVerdict::Block).await;

        let start = Instant::now();
        if let Some(tab) = tab_id {
            self.redirect(
                tab,
                target,
                &domain,
                DecisionStage::Manual,
                DecisionTier::Manual,
                "Manually blocked.".to_string(),
                start,
            )
            .await;
        } else {
            self.stats.inc_blocked(&domain);
            self.log_decision(
                -1,
                &domain,
                target,
                DecisionStage::Manual,
                DecisionAction::Blocked,
                DecisionTier::Manual,
                Some("Manually blocked.".to_string()),
                start,
            )
            .await;
        }
        Some(domain)
    }

    pub async fn allow_domain(&self, target: &str) -> Option<String> {
        let domain = resolve_domain(target)?;
        self.cache.set(&domain, StoredVerdict::Safe).await;

        self.stats.inc_allowed(&domain);
        self.log_decision(
            -1,
            &domain,
            target,
            DecisionStage::Manual,
            DecisionAction::Allowed,
            DecisionTier::Manual,
            Some("Manually allowed.".to_string()),
            Instant::now(),
        )
        .await;
        Some(domain)
    }

    async fn classify_search_remote(&self, query: &str) -> Verdict {
        let start = Instant::now();
        let verdict = self.classifier.classify_search(query).await;
        self.stats
            .record_remote_latency(start.elapsed().as_millis() as u64);
        if verdict == Verdict::Unknown {
            self.stats.inc_remote_failure();
        }
        verdict
    }

    async fn classify_site_remote(
        &self,
        domain: &str,
        url: &str,
        title: Option<&str>,
        weak_context: Option<&str>,
    ) -> Verdict {
        let start = Instant::now();
        let verdict = self
            .classifier
            .classify_site(domain, url, title, weak_context)
            .await;
        self.stats
            .record_remote_latency(start.elapsed().as_millis() as u64);
        if verdict == Verdict::Unknown {
            self.stats.inc_remote_failure();
        }
        verdict
    }

    fn block_page_url(&self, reason: &str, original: &str) -> String {
        match Url::parse(&self.config.block_page) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("reason", reason)
                    .append_pair("url", original);
                url.to_string()
            }
            Err(_) => self.config.block_page.clone(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn redirect(
        &self,
        tab_id: i64,
        original_url: &str,
        domain: &str,
        stage: DecisionStage,
        tier: DecisionTier,
        reason: String,
        start: Instant,
    ) -> Decision {
        let target = self.block_page_url(&reason, original_url);
        if self.debouncer.fire_once(tab_id, &target).await {
            self.stats.inc_redirect_fired();
        } else {
            self.stats.inc_redirect_debounced();
        }

        self.stats.inc_blocked(domain);
        self.log_decision(
            tab_id,
            domain,
            original_url,
            stage,
            DecisionAction::Blocked,
            tier,
            Some(reason),
            start,
        )
        .await;
        Decision::Redirected
    }

    async fn allow(
        &self,
        tab_id: i64,
        url: &str,
        domain: &str,
        stage: DecisionStage,
        tier: DecisionTier,
        start: Instant,
    ) -> Decision {
        self.stats.inc_allowed(domain);
        self.log_decision(
            tab_id,
            domain,
            url,
            stage,
            DecisionAction::Allowed,
            tier,
            None,
            start,
        )
        .await;
        Decision::Allowed
    }

    #[allow(clippy::too_many_arguments)]
    async fn log_decision(
        &self,
        tab_id: i64,
        domain: &str,
        url: &str,
        stage: DecisionStage,
        action: DecisionAction,
        tier: DecisionTier,
        reason: Option<String>,
        start: Instant,
    ) {
        if !self.config.logging.enable {
            return;
        }
        self.logger
            .log(DecisionLogEntry {
                tab_id,
                domain: domain.to_string(),
                url: url.to_string(),
                stage,
                action,
                tier,
                reason,
                latency_ms: start.elapsed().as_millis() as u64,
            })
            .await;
    }
}

fn resolve_domain(target: &str) -> Option<String> {
    if target.contains("://") {
        normalize_domain(target)
    } else {
        normalize_domain(&format!("https://{}", target))
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use crate::config::RulesConfig;
    use crate::engine::KeywordMatcher;
    use crate::store::MemoryStore;
    use crate::verdict::Verdict;
    use anyhow::Result;

    struct AlwaysUnknownClassifier;

    #[async_trait::async_trait]
    impl RemoteClassifier for AlwaysUnknownClassifier {
        async fn classify_search(&self, _query: &str) -> Verdict {
            Verdict::Unknown
        }

        async fn classify_site(
            &self,
            _domain: &str,
            _url: &str,
            _title: Option<&str>,
            _last_search_query: Option<&str>,
        ) -> Verdict {
            Verdict::Unknown
        }

        async fn health(&self) -> bool {
            true
        }
    }

    struct NoopTabs;

    #[async_trait::async_trait]
    impl crate::debounce::TabController for NoopTabs {
        async fn update_tab(&self, _tab_id: i64, _url: &str) -> Result<()> {
            Ok(())
        }
    }

    /// A guard wired to inert collaborators, for transport-level tests.
    pub async fn minimal_guard() -> Arc<NavigationGuard> {
        let config = Config::default();
        let stats = StatsCollector::new(0);
        let logger = DecisionLogger::new(config.logging.clone(), vec![], None);
        let matcher: Arc<dyn TextMatcher> = Arc::new(
            KeywordMatcher::from_rules(&RulesConfig::default()).expect("default rules must build"),
        );
        let cache = Arc::new(VerdictCache::new(Arc::new(MemoryStore::new()), 100));
        let debouncer = Arc::new(RedirectDebouncer::new(
            Arc::new(NoopTabs),
            Duration::from_secs(3),
        ));
        Arc::new(NavigationGuard::new(
            config,
            stats,
            logger,
            matcher,
            Arc::new(AlwaysUnknownClassifier),
            cache,
            debouncer,
            GuardState::new(),
        ))
    }
}
