use crate::config::LoggingConfig;
use crate::db::LogWriter;
use crate::logger::types::{DecisionLogEntry, DecisionLogSink};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::{error, info};

/// Writes decisions to SQLite on a dedicated thread so rusqlite never runs
/// on the async runtime.
pub struct SqliteLogSink {
    tx: Sender<DecisionLogEntry>,
}

impl SqliteLogSink {
    pub fn new(writer: LogWriter, config: LoggingConfig) -> Self {
        let (tx, rx) = mpsc::channel::<DecisionLogEntry>();
        let retention_hours = config.sqlite_retention_hours;

        thread::spawn(move || {
            if let Err(e) = run_sqlite_writer(writer, retention_hours, rx) {
                error!("SQLite writer failed: {}", e);
            }
        });

        Self { tx }
    }
}

impl DecisionLogSink for SqliteLogSink {
    fn log(&self, entry: &DecisionLogEntry) {
        if let Err(e) = self.tx.send(entry.clone()) {
            error!("Failed to send log to SQLite writer: {}", e);
        }
    }
}

fn run_sqlite_writer(
    mut writer: LogWriter,
    retention_hours: u64,
    rx: Receiver<DecisionLogEntry>,
) -> anyhow::Result<()> {
    // Schema is created by DbClient::initialize at startup.
    let mut last_cleanup = SystemTime::now();

    while let Ok(entry) = rx.recv() {
        if let Err(e) = writer.insert_log(&entry) {
            error!("Failed to insert log entry: {}", e);
        }

        // Periodic retention cleanup
        if last_cleanup.elapsed().unwrap_or_default() > Duration::from_secs(3600) {
            if let Err(e) = writer.prune_logs(retention_hours) {
                error!("Failed to prune old logs: {}", e);
            }
            last_cleanup = SystemTime::now();
        }
    }

    info!("SQLite writer stopping.");
    Ok(())
}
