use crate::config::SearchEngineConfig;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use url::Url;

/// A navigation recognized as a search-results page.
#[derive(Debug, Clone)]
pub struct SearchHit<'a> {
    pub query: String,
    pub engine: &'a SearchEngineConfig,
}

/// Matches a URL against the configured search surfaces and extracts the
/// query. Host matching is a substring check (`host_pattern` like `google.`
/// covers every regional TLD, matching the original allow-list policy); the
/// path must match exactly. A surface with an absent or empty query
/// parameter still counts as a hit with an empty query.
pub fn match_search_surface<'a>(
    url: &Url,
    engines: &'a [SearchEngineConfig],
) -> Option<SearchHit<'a>> {
    let host = url.host_str()?;
    for engine in engines {
        if host.contains(&engine.host_pattern) && url.path() == engine.path {
            let query = url
                .query_pairs()
                .find(|(k, _)| k == &engine.param)
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default();
            return Some(SearchHit { query, engine });
        }
    }
    None
}

#[derive(Debug)]
struct ContextSlot {
    query: String,
    captured_at: Instant,
}

/// The most recent search query, kept as weak corroborating context for a
/// subsequent website classification. Single shared slot, last write wins.
/// It self-expires after the TTL so stale context never leaks into an
/// unrelated later decision; expiry is lazy on read plus a periodic sweep
/// from the maintenance loop.
pub struct SearchContext {
    slot: RwLock<Option<ContextSlot>>,
    ttl: Duration,
}

impl SearchContext {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: RwLock::new(None),
            ttl,
        }
    }

    pub fn record(&self, query: &str) {
        let mut slot = self.slot.write().unwrap();
        *slot = Some(ContextSlot {
            query: query.to_string(),
            captured_at: Instant::now(),
        });
    }

    pub fn current(&self) -> Option<String> {
        {
            let slot = self.slot.read().unwrap();
            match slot.as_ref() {
                Some(ctx) if ctx.captured_at.elapsed() < self.ttl => {
                    return Some(ctx.query.clone())
                }
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: clear so the slot does not linger.
        self.clear_expired();
        None
    }

    pub fn clear_expired(&self) {
        let mut slot = self.slot.write().unwrap();
        if let Some(ctx) = slot.as_ref() {
            if ctx.captured_at.elapsed() >= self.ttl {
                *slot = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn engines() -> Vec<SearchEngineConfig> {
        Config::default().search_engines
    }

    #[test]
    fn test_google_search_surface() {
        let engines = engines();
        let url = Url::parse("https://www.google.com/search?q=readmanhwa+chapter+5").unwrap();
        let hit = match_search_surface(&url, &engines).unwrap();
        assert_eq!(hit.query, "readmanhwa chapter 5");
        assert!(hit.engine.reusable_context);
        assert!(!hit.engine.video_search);
    }

    #[test]
    fn test_regional_tld_matches() {
        let engines = engines();
        let url = Url::parse("https://www.google.co.uk/search?q=test").unwrap();
        assert!(match_search_surface(&url, &engines).is_some());
    }

    #[test]
    fn test_video_platform_results_surface() {
        let engines = engines();
        let url = Url::parse("https://www.youtube.com/results?search_query=one+piece").unwrap();
        let hit = match_search_surface(&url, &engines).unwrap();
        assert_eq!(hit.query, "one piece");
        assert!(hit.engine.video_search);
        assert!(!hit.engine.reusable_context);
    }

    #[test]
    fn test_non_search_pages_do_not_match() {
        let engines = engines();
        for url in [
            "https://www.google.com/maps",
            "https://www.youtube.com/watch?v=abc",
            "https://example.com/search?q=manga",
        ] {
            let url = Url::parse(url).unwrap();
            assert!(match_search_surface(&url, &engines).is_none(), "{}", url);
        }
    }

    #[test]
    fn test_missing_query_param_is_empty_hit() {
        let engines = engines();
        let url = Url::parse("https://www.google.com/search").unwrap();
        let hit = match_search_surface(&url, &engines).unwrap();
        assert_eq!(hit.query, "");
    }

    #[test]
    fn test_context_last_write_wins() {
        let ctx = SearchContext::new(Duration::from_secs(300));
        ctx.record("first");
        ctx.record("second");
        assert_eq!(ctx.current(), Some("second".to_string()));
    }

    #[test]
    fn test_context_expires_after_ttl() {
        let ctx = SearchContext::new(Duration::from_millis(10));
        ctx.record("readmanhwa");
        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(ctx.current(), None);
        // The slot is actually cleared, not just hidden.
        assert_eq!(ctx.current(), None);
    }
}
