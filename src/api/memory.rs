use super::source::ApiDataSource;
use crate::logger::types::DecisionLogEntry;
use crate::stats::{StatsCollector, StatsSnapshot};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

pub struct MemoryDataSource {
    stats: Arc<StatsCollector>,
    logs_buffer: Arc<RwLock<VecDeque<DecisionLogEntry>>>,
}

impl MemoryDataSource {
    pub fn new(
        stats: Arc<StatsCollector>,
        logs_buffer: Arc<RwLock<VecDeque<DecisionLogEntry>>>,
    ) -> Self {
        Self { stats, logs_buffer }
    }
}

#[async_trait]
impl ApiDataSource for MemoryDataSource {
    async fn get_stats(&self) -> StatsSnapshot {
        self.stats.get_snapshot()
    }

    async fn get_logs(&self, limit: usize) -> Vec<DecisionLogEntry> {
        let buffer = self.logs_buffer.read().unwrap();
        buffer.iter().rev().take(limit).cloned().collect()
    }
}
