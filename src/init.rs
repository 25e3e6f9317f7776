//! Initialization helpers for the application startup.

use crate::api::{ApiDataSource, MemoryDataSource, SqliteDataSource};
use crate::config::Config;
use crate::db::DbClient;
use crate::logger::{DecisionLogSink, MemoryLogSink};
use crate::stats::StatsCollector;
use std::sync::Arc;
use tracing::info;

/// Sets up the tracing subscriber with the configured filters.
pub fn setup_logging(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = config.logging.level.clone();

        // Suppress HTTP client/server internals unless explicitly overridden
        if !filter.contains("hyper") {
            filter.push_str(",hyper=off");
        }
        if !filter.contains("reqwest") {
            filter.push_str(",reqwest=off");
        }

        tracing_subscriber::EnvFilter::new(filter)
    });

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

/// Initializes the database client and the API data source.
///
/// Returns a tuple containing:
/// 1. An optional `MemoryLogSink` (if no SQLite sink is used).
/// 2. The `ApiDataSource` (either SQLite-backed or memory-backed).
/// 3. The optional shared `DbClient`.
#[allow(clippy::type_complexity)]
pub fn init_data_source(
    config: &Config,
    stats: Arc<StatsCollector>,
) -> (
    Option<Box<dyn DecisionLogSink>>,
    Arc<dyn ApiDataSource>,
    Option<Arc<DbClient>>,
) {
    let use_sqlite_sink = config
        .logging
        .decision_log_sinks
        .contains(&"sqlite".to_string());

    let mut db_client: Option<Arc<DbClient>> = None;

    if use_sqlite_sink {
        info!("SQLite sink enabled. Initializing shared DbClient.");
        match DbClient::new(config.logging.sqlite_path.clone()) {
            Ok(client) => {
                let client = Arc::new(client);
                if let Err(e) = client.initialize() {
                    tracing::error!("Failed to initialize SQLite database: {}", e);
                } else {
                    db_client = Some(client);
                }
            }
            Err(e) => tracing::error!("Failed to open SQLite database: {}", e),
        }
    }

    if let Some(client) = db_client.clone() {
        // With a shared DbClient available, the API reads from SQLite too.
        info!("Using SQLite data source for API.");
        (None, Arc::new(SqliteDataSource::new(client)), db_client)
    } else {
        info!("SQLite sink disabled. Using in-memory data source for API.");
        let sink = MemoryLogSink::new(100);
        let buffer = sink.clone_buffer();
        (
            Some(Box::new(sink)),
            Arc::new(MemoryDataSource::new(stats, buffer)),
            None,
        )
    }
}
