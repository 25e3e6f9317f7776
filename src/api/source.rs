use crate::logger::types::DecisionLogEntry;
use crate::stats::StatsSnapshot;
use async_trait::async_trait;

/// Read-side backing for the API. Either live in-memory counters or the
/// SQLite decision log, depending on which sinks are configured.
#[async_trait]
pub trait ApiDataSource: Send + Sync {
    async fn get_stats(&self) -> StatsSnapshot;
    async fn get_logs(&self, limit: usize) -> Vec<DecisionLogEntry>;
}
