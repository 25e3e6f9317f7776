use serde::Serialize;

/// One record per pipeline decision, fanned out to the configured sinks.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionLogEntry {
    pub tab_id: i64,
    pub domain: String,
    pub url: String,
    pub stage: DecisionStage,
    pub action: DecisionAction,
    pub tier: DecisionTier,
    pub reason: Option<String>,
    pub latency_ms: u64,
}

/// Which check produced the decision.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum DecisionStage {
    Search,
    Site,
    Page,
    Manual,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum DecisionAction {
    Allowed,
    Blocked,
}

/// Which tier of the pipeline was authoritative for the decision.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum DecisionTier {
    Cache,
    Rules,
    Remote,
    Policy,
    Manual,
}

pub trait DecisionLogSink: Send + Sync {
    fn log(&self, entry: &DecisionLogEntry);
}
