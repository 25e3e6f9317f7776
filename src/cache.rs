use crate::store::RecordStore;
use crate::verdict::StoredVerdict;
use moka::future::Cache;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Persistent domain → verdict cache.
///
/// Entries live in a single serialized record behind [`RecordStore`], so
/// every write is a read-merge-write of the whole record, serialized by an
/// async mutex so concurrent classifications for different domains never
/// clobber each other's entries. A moka read layer keeps `get` off the store
/// on the hot path; it is updated on successful writes and invalidated on
/// failed ones, so a lost write degrades to "unknown next time" instead of
/// serving a verdict that never reached disk.
pub struct VerdictCache {
    store: Arc<dyn RecordStore>,
    read_cache: Cache<String, StoredVerdict>,
    write_lock: Mutex<()>,
}

impl VerdictCache {
    pub fn new(store: Arc<dyn RecordStore>, read_cache_capacity: u64) -> Self {
        Self {
            store,
            read_cache: Cache::builder().max_capacity(read_cache_capacity).build(),
            write_lock: Mutex::new(()),
        }
    }

    /// Loads and deserializes the whole record. A missing record is an empty
    /// map; an unreadable or malformed one is treated the same, logged, and
    /// never propagated to the interception pipeline.
    async fn load_record(&self) -> FxHashMap<String, StoredVerdict> {
        let payload = match self.store.read().await {
            Ok(Some(payload)) => payload,
            Ok(None) => return FxHashMap::default(),
            Err(e) => {
                warn!("Verdict record read failed, treating as empty: {}", e);
                return FxHashMap::default();
            }
        };
        match serde_json::from_str(&payload) {
            Ok(map) => map,
            Err(e) => {
                warn!("Verdict record is malformed, treating as empty: {}", e);
                FxHashMap::default()
            }
        }
    }

    async fn persist(&self, record: &FxHashMap<String, StoredVerdict>) -> anyhow::Result<()> {
        // Keys sorted so the on-disk record diffs cleanly.
        let ordered: BTreeMap<&String, &StoredVerdict> = record.iter().collect();
        let payload = serde_json::to_string(&ordered)?;
        self.store.write(&payload).await
    }

    pub async fn get(&self, domain: &str) -> Option<StoredVerdict> {
        if let Some(v) = self.read_cache.get(domain).await {
            return Some(v);
        }
        let record = self.load_record().await;
        let verdict = record.get(domain).copied()?;
        self.read_cache.insert(domain.to_string(), verdict).await;
        Some(verdict)
    }

    /// Merges one entry into the persisted record. Persistence failure gets
    /// one retry, then degrades: the read layer is invalidated so the next
    /// lookup re-reads the store and sees the domain as unknown.
    pub async fn set(&self, domain: &str, verdict: StoredVerdict) {
        let _guard = self.write_lock.lock().await;

        let mut record = self.load_record().await;
        record.insert(domain.to_string(), verdict);

        let mut result = self.persist(&record).await;
        if result.is_err() {
            result = self.persist(&record).await;
        }

        match result {
            Ok(()) => {
                self.read_cache.insert(domain.to_string(), verdict).await;
            }
            Err(e) => {
                warn!("Verdict write for {} failed, entry dropped: {}", domain, e);
                self.read_cache.invalidate(domain).await;
            }
        }
    }

    /// Preloads baseline SAFE domains at startup. Persisted entries always
    /// win over the baseline, so a manual BLOCK survives restarts.
    pub async fn seed_baseline(&self, domains: &[String]) {
        let _guard = self.write_lock.lock().await;

        let mut record = self.load_record().await;
        let mut added = 0usize;
        for domain in domains {
            if !record.contains_key(domain) {
                record.insert(domain.clone(), StoredVerdict::Safe);
                added += 1;
            }
        }
        if added == 0 {
            return;
        }
        if let Err(e) = self.persist(&record).await {
            warn!("Baseline seed write failed: {}", e);
            return;
        }
        info!("Seeded {} baseline SAFE domains", added);
    }

    /// Full record view for the control API.
    pub async fn snapshot(&self) -> BTreeMap<String, StoredVerdict> {
        self.load_record().await.into_iter().collect()
    }

    pub async fn len(&self) -> usize {
        self.load_record().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
