use rustc_hash::FxHashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::{self, Duration};
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct TopItem {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub total_decisions: u64,
    pub blocked: u64,
    pub cache_hits: u64,
    pub rule_blocks: u64,
    pub remote_calls: u64,
    pub avg_remote_latency_ms: f64,
    pub top_domains: Vec<TopItem>,
    pub top_blocked_domains: Vec<TopItem>,
    pub started_at: u64,
    pub updated_at: u64,
}

/// Lock-free counters for the decision pipeline, with a periodic dump task.
#[derive(Debug)]
pub struct StatsCollector {
    total_events: AtomicU64,
    ignored_events: AtomicU64,
    total_decisions: AtomicU64,
    allowed: AtomicU64,
    blocked: AtomicU64,
    cache_hits: AtomicU64,
    rule_blocks: AtomicU64,
    remote_calls: AtomicU64,
    remote_failures: AtomicU64,
    remote_total_ms: AtomicU64,
    redirects_fired: AtomicU64,
    redirects_debounced: AtomicU64,

    // Top-list tracking for the in-memory API source.
    domain_decisions: Mutex<FxHashMap<String, u64>>,
    domain_blocks: Mutex<FxHashMap<String, u64>>,

    started_at: u64,
    log_interval: Duration,
}

impl StatsCollector {
    pub fn new(log_interval_sec: u64) -> Arc<Self> {
        let stats = Arc::new(Self {
            total_events: AtomicU64::new(0),
            ignored_events: AtomicU64::new(0),
            total_decisions: AtomicU64::new(0),
            allowed: AtomicU64::new(0),
            blocked: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            rule_blocks: AtomicU64::new(0),
            remote_calls: AtomicU64::new(0),
            remote_failures: AtomicU64::new(0),
            remote_total_ms: AtomicU64::new(0),
            redirects_fired: AtomicU64::new(0),
            redirects_debounced: AtomicU64::new(0),
            domain_decisions: Mutex::new(FxHashMap::default()),
            domain_blocks: Mutex::new(FxHashMap::default()),
            started_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            log_interval: Duration::from_secs(log_interval_sec),
        });

        // Spawn the background dumper unless disabled (interval 0).
        if log_interval_sec > 0 {
            let stats_clone = stats.clone();
            tokio::spawn(async move {
                stats_clone.run_logger().await;
            });
        }

        stats
    }

    pub fn inc_events(&self) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ignored(&self) {
        self.ignored_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_allowed(&self, domain: &str) {
        self.total_decisions.fetch_add(1, Ordering::Relaxed);
        self.allowed.fetch_add(1, Ordering::Relaxed);
        self.inc_domain(&self.domain_decisions, domain);
    }

    pub fn inc_blocked(&self, domain: &str) {
        self.total_decisions.fetch_add(1, Ordering::Relaxed);
        self.blocked.fetch_add(1, Ordering::Relaxed);
        self.inc_domain(&self.domain_decisions, domain);
        self.inc_domain(&self.domain_blocks, domain);
    }

    pub fn inc_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rule_block(&self) {
        self.rule_blocks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_remote_failure(&self) {
        self.remote_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remote_latency(&self, ms: u64) {
        self.remote_calls.fetch_add(1, Ordering::Relaxed);
        self.remote_total_ms.fetch_add(ms, Ordering::Relaxed);
    }

    pub fn inc_redirect_fired(&self) {
        self.redirects_fired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_redirect_debounced(&self) {
        self.redirects_debounced.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_domain(&self, map: &Mutex<FxHashMap<String, u64>>, domain: &str) {
        if domain.is_empty() {
            return;
        }
        let mut map = map.lock().unwrap();
        *map.entry(domain.to_string()).or_insert(0) += 1;
    }

    fn top_n(map: &Mutex<FxHashMap<String, u64>>, n: usize) -> Vec<TopItem> {
        let map = map.lock().unwrap();
        let mut items: Vec<TopItem> = map
            .iter()
            .map(|(name, &count)| TopItem {
                name: name.clone(),
                count,
            })
            .collect();
        items.sort_by(|a, b| b.count.cmp(&a.count));
        items.truncate(n);
        items
    }

    pub fn get_snapshot(&self) -> StatsSnapshot {
        let remote_calls = self.remote_calls.load(Ordering::Relaxed);
        let remote_total_ms = self.remote_total_ms.load(Ordering::Relaxed);
        StatsSnapshot {
            total_decisions: self.total_decisions.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            rule_blocks: self.rule_blocks.load(Ordering::Relaxed),
            remote_calls,
            avg_remote_latency_ms: if remote_calls > 0 {
                remote_total_ms as f64 / remote_calls as f64
            } else {
                0.0
            },
            top_domains: Self::top_n(&self.domain_decisions, 5),
            top_blocked_domains: Self::top_n(&self.domain_blocks, 5),
            started_at: self.started_at,
            updated_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }

    async fn run_logger(&self) {
        let mut interval = time::interval(self.log_interval);
        loop {
            interval.tick().await;
            self.dump_stats();
        }
    }

    fn dump_stats(&self) {
        let events = self.total_events.load(Ordering::Relaxed);
        let ignored = self.ignored_events.load(Ordering::Relaxed);
        let decisions = self.total_decisions.load(Ordering::Relaxed);
        let blocked = self.blocked.load(Ordering::Relaxed);
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let remote_calls = self.remote_calls.load(Ordering::Relaxed);
        let remote_failures = self.remote_failures.load(Ordering::Relaxed);
        let remote_total_ms = self.remote_total_ms.load(Ordering::Relaxed);
        let fired = self.redirects_fired.load(Ordering::Relaxed);
        let debounced = self.redirects_debounced.load(Ordering::Relaxed);

        info!(
            "STATS DUMP: Events: {} (ignored {}), Decisions: {}, Blocked: {} ({:.1}%), CacheHits: {}, Remote: {} calls ({} failed, avg {:.1}ms), Redirects: {} fired / {} debounced",
            events,
            ignored,
            decisions,
            blocked,
            if decisions > 0 {
                (blocked as f64 / decisions as f64) * 100.0
            } else {
                0.0
            },
            hits,
            remote_calls,
            remote_failures,
            if remote_calls > 0 {
                remote_total_ms as f64 / remote_calls as f64
            } else {
                0.0
            },
            fired,
            debounced
        );
    }
}
