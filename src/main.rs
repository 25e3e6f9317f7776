use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

use navguard::cache::VerdictCache;
use navguard::classifier::{HttpClassifier, RemoteClassifier};
use navguard::config::Config;
use navguard::debounce::RedirectDebouncer;
use navguard::engine::{MatcherSource, RuleManager};
use navguard::guard::{GuardState, NavigationGuard};
use navguard::host::{run_host_loop, StdioTabController};
use navguard::init::{init_data_source, setup_logging};
use navguard::logger::DecisionLogger;
use navguard::stats::StatsCollector;
use navguard::store::FileStore;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load Config
    let config_path = std::env::args().nth(1).unwrap_or("config.toml".to_string());
    let config_exists = std::path::Path::new(&config_path).exists();
    let config = if config_exists {
        Config::load(&config_path).await?
    } else {
        Config::default()
    };

    // 2. Setup Logging
    setup_logging(&config);
    info!("Starting navguard...");

    if !config_exists {
        info!("Config file not found, using defaults.");
    }

    // 3. Init Stats
    let stats = StatsCollector::new(if config.stats.enable {
        config.stats.log_interval_seconds
    } else {
        0
    });

    // 4. Init Data Source & DB
    let (memory_sink, data_source, db_client) = init_data_source(&config, stats.clone());

    // 5. Init Decision Logger
    let mut extra_sinks = Vec::new();
    if let Some(sink) = memory_sink {
        extra_sinks.push(sink);
    }
    let logger = DecisionLogger::new(config.logging.clone(), extra_sinks, db_client);

    // 6. Init Rule Manager & Build Initial Matcher
    let manager = Arc::new(RuleManager::new(
        config_exists.then(|| PathBuf::from(&config_path)),
        config.rules.clone(),
    ));
    let initial_matcher = manager.rebuild().await;

    // 7. Init Remote Classifier & Startup Probe
    let classifier = Arc::new(HttpClassifier::new(&config.classifier));
    if classifier.health().await {
        info!("Verdict service reachable at {}", config.classifier.base_url);
    } else {
        warn!(
            "Verdict service unreachable at {}; remote tier degraded to allow",
            config.classifier.base_url
        );
    }

    // 8. Init Verdict Cache & Seed Baseline
    let store = Arc::new(FileStore::new(&config.store.path));
    let cache = Arc::new(VerdictCache::new(store, config.store.read_cache_capacity));
    cache.seed_baseline(&config.baseline_safe).await;

    // 9. Init Tab Controller & Debouncer
    let controller = StdioTabController::spawn(tokio::io::stdout());
    let debouncer = Arc::new(RedirectDebouncer::new(
        controller,
        Duration::from_secs(config.guard.debounce_window_secs),
    ));

    // 10. Init Guard State (Pause Control)
    let guard_state = GuardState::new();

    // 11. Build the Navigation Guard
    let guard = Arc::new(NavigationGuard::new(
        config.clone(),
        stats.clone(),
        logger.clone(),
        initial_matcher,
        classifier,
        cache,
        debouncer,
        guard_state.clone(),
    ));

    // 12. Spawn Rules Refresh Task (triggered via API)
    let (refresh_tx, mut refresh_rx) = tokio::sync::mpsc::channel::<()>(1);
    let manager_for_loop = manager.clone();
    let guard_for_refresh = guard.clone();
    tokio::spawn(async move {
        while refresh_rx.recv().await.is_some() {
            info!("Rules refresh triggered via API...");
            let matcher = manager_for_loop.rebuild().await;
            guard_for_refresh.update_rules(matcher).await;
        }
    });

    // 13. Start API Server
    if config.api.enable {
        let api_guard = guard.clone();
        let api_state = guard_state.clone();
        let api_config = config.clone();
        let api_refresh_tx = refresh_tx.clone();
        let api_port = config.api.port;
        tokio::spawn(async move {
            navguard::api::start_api_server(
                data_source,
                api_guard,
                api_state,
                api_config,
                api_refresh_tx,
                api_port,
            )
            .await;
        });
    }

    // 14. Spawn Maintenance Loop
    let maintenance_guard = guard.clone();
    let maintenance_interval = Duration::from_secs(config.guard.maintenance_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(maintenance_interval);
        interval.tick().await;
        loop {
            interval.tick().await;
            maintenance_guard.run_maintenance();
        }
    });

    // 15. Run Host Loop & Graceful Shutdown
    info!("Listening for navigation events on stdin");
    tokio::select! {
        result = run_host_loop(tokio::io::stdin(), guard) => {
            result?;
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received.");
        }
    }

    Ok(())
}
