use anyhow::Result;
use rustc_hash::FxHashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Side-effecting seam to the host's tab platform.
#[async_trait::async_trait]
pub trait TabController: Send + Sync {
    async fn update_tab(&self, tab_id: i64, url: &str) -> Result<()>;
}

/// Suppresses duplicate redirects for the same (tab, target) pair.
///
/// Navigation lifecycles commonly emit several events for one logical
/// navigation (pre-navigation, commit, history), and overlapping handlers
/// would otherwise issue the same redirect more than once and thrash tab
/// state. Controller failures are logged, never propagated.
pub struct RedirectDebouncer {
    controller: std::sync::Arc<dyn TabController>,
    window: Duration,
    recent: Mutex<FxHashMap<i64, (String, Instant)>>,
}

impl RedirectDebouncer {
    pub fn new(controller: std::sync::Arc<dyn TabController>, window: Duration) -> Self {
        Self {
            controller,
            window,
            recent: Mutex::new(FxHashMap::default()),
        }
    }

    /// Performs the redirect unless the identical one fired within the
    /// window. Returns whether a redirect was actually issued.
    pub async fn fire_once(&self, tab_id: i64, target: &str) -> bool {
        {
            let mut recent = self.recent.lock().unwrap();
            if let Some((url, fired_at)) = recent.get(&tab_id) {
                if url == target && fired_at.elapsed() < self.window {
                    debug!("Redirect for tab {} suppressed (duplicate)", tab_id);
                    return false;
                }
            }
            recent.insert(tab_id, (target.to_string(), Instant::now()));
        }

        if let Err(e) = self.controller.update_tab(tab_id, target).await {
            error!("Redirect for tab {} failed: {}", tab_id, e);
        }
        true
    }

    /// Drops entries older than `max_age`; called from the maintenance loop.
    pub fn prune(&self, max_age: Duration) {
        let mut recent = self.recent.lock().unwrap();
        recent.retain(|_, (_, fired_at)| fired_at.elapsed() < max_age);
    }

    #[cfg(test)]
    fn tracked_tabs(&self) -> usize {
        self.recent.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingTabs {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl TabController for CountingTabs {
        async fn update_tab(&self, _tab_id: i64, _url: &str) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_duplicate_within_window_fires_once() {
        let tabs = Arc::new(CountingTabs {
            calls: AtomicUsize::new(0),
        });
        let debouncer = RedirectDebouncer::new(tabs.clone(), Duration::from_secs(3));

        assert!(debouncer.fire_once(7, "http://blocked/").await);
        assert!(!debouncer.fire_once(7, "http://blocked/").await);
        assert_eq!(tabs.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fires_again_after_window() {
        let tabs = Arc::new(CountingTabs {
            calls: AtomicUsize::new(0),
        });
        let debouncer = RedirectDebouncer::new(tabs.clone(), Duration::from_millis(20));

        assert!(debouncer.fire_once(7, "http://blocked/").await);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(debouncer.fire_once(7, "http://blocked/").await);
        assert_eq!(tabs.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_different_target_or_tab_is_not_suppressed() {
        let tabs = Arc::new(CountingTabs {
            calls: AtomicUsize::new(0),
        });
        let debouncer = RedirectDebouncer::new(tabs.clone(), Duration::from_secs(3));

        assert!(debouncer.fire_once(7, "http://blocked/?a").await);
        assert!(debouncer.fire_once(7, "http://blocked/?b").await);
        assert!(debouncer.fire_once(8, "http://blocked/?a").await);
        assert_eq!(tabs.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_prune_drops_stale_entries() {
        let tabs = Arc::new(CountingTabs {
            calls: AtomicUsize::new(0),
        });
        let debouncer = RedirectDebouncer::new(tabs, Duration::from_secs(3));

        debouncer.fire_once(1, "http://blocked/").await;
        debouncer.fire_once(2, "http://blocked/").await;
        assert_eq!(debouncer.tracked_tabs(), 2);

        tokio::time::sleep(Duration::from_millis(30)).await;
        debouncer.prune(Duration::from_millis(10));
        assert_eq!(debouncer.tracked_tabs(), 0);
    }
}
