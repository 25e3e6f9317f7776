pub mod console_sink;
pub mod memory_sink;
pub mod sqlite_sink;
pub mod types;

pub use self::console_sink::ConsoleLogSink;
pub use self::memory_sink::MemoryLogSink;
pub use self::sqlite_sink::SqliteLogSink;
pub use self::types::{
    DecisionAction, DecisionLogEntry, DecisionLogSink, DecisionStage, DecisionTier,
};

use crate::config::LoggingConfig;
use crate::db::DbClient;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::error;

/// Fan-out of decision records to the configured sinks. Each sink gets its
/// own channel and task; `log` is fire-and-forget so a slow sink can never
/// stall the interception pipeline.
pub struct DecisionLogger {
    sinks: Vec<mpsc::Sender<DecisionLogEntry>>,
}

fn spawn_sink(sink: Box<dyn DecisionLogSink>) -> mpsc::Sender<DecisionLogEntry> {
    let (tx, mut rx) = mpsc::channel(1000);
    tokio::spawn(async move {
        while let Some(entry) = rx.recv().await {
            sink.log(&entry);
        }
    });
    tx
}

impl DecisionLogger {
    pub fn new(
        config: LoggingConfig,
        extra_sinks: Vec<Box<dyn DecisionLogSink>>,
        db_client: Option<Arc<DbClient>>,
    ) -> Arc<Self> {
        let mut sinks = Vec::new();

        for sink_type in &config.decision_log_sinks {
            if sink_type == "console" {
                sinks.push(spawn_sink(Box::new(ConsoleLogSink::new(config.clone()))));
            } else if sink_type == "sqlite" {
                match db_client.as_ref().map(|c| c.create_log_writer()) {
                    Some(Ok(writer)) => {
                        sinks.push(spawn_sink(Box::new(SqliteLogSink::new(
                            writer,
                            config.clone(),
                        ))));
                    }
                    Some(Err(e)) => error!("Failed to create SQLite log writer: {}", e),
                    None => error!("SQLite sink configured but database is unavailable"),
                }
            } else {
                error!("Unknown log sink type: {}", sink_type);
            }
        }

        for sink in extra_sinks {
            sinks.push(spawn_sink(sink));
        }

        Arc::new(Self { sinks })
    }

    pub async fn log(&self, entry: DecisionLogEntry) {
        let len = self.sinks.len();
        for (i, sink) in self.sinks.iter().enumerate() {
            // Fire and forget, don't block caller if buffer full
            if i == len - 1 {
                let _ = sink.try_send(entry);
                break;
            }
            let _ = sink.try_send(entry.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fan_out_reaches_extra_sink() {
        let memory = MemoryLogSink::new(10);
        let buffer = memory.clone_buffer();
        let logger = DecisionLogger::new(
            LoggingConfig {
                decision_log_sinks: vec![],
                ..LoggingConfig::default()
            },
            vec![Box::new(memory)],
            None,
        );

        logger
            .log(DecisionLogEntry {
                tab_id: 1,
                domain: "mangadex.org".to_string(),
                url: "https://mangadex.org/title/1".to_string(),
                stage: DecisionStage::Site,
                action: DecisionAction::Blocked,
                tier: DecisionTier::Rules,
                reason: Some("manga".to_string()),
                latency_ms: 2,
            })
            .await;

        // The sink task runs asynchronously.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let logs = buffer.read().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, DecisionAction::Blocked);
        assert_eq!(logs[0].domain, "mangadex.org");
    }
}
