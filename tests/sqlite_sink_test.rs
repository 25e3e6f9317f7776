use navguard::config::LoggingConfig;
use navguard::db::DbClient;
use navguard::logger::{
    DecisionAction, DecisionLogEntry, DecisionLogger, DecisionStage, DecisionTier,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_sqlite_sink_logging() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test_sink.db");
    let db_path = db_path.to_string_lossy().to_string();

    let config = LoggingConfig {
        enable: true,
        log_blocked: true,
        log_all_decisions: true,
        format: "text".to_string(),
        level: "info".to_string(),
        decision_log_sinks: vec!["sqlite".to_string()],
        sqlite_path: db_path.clone(),
        sqlite_retention_hours: 24,
    };

    let db_client = Arc::new(DbClient::new(db_path).unwrap());
    db_client.initialize().unwrap();

    let logger = DecisionLogger::new(config, vec![], Some(db_client.clone()));

    logger
        .log(DecisionLogEntry {
            tab_id: 3,
            domain: "mangadex.org".to_string(),
            url: "https://mangadex.org/title/123".to_string(),
            stage: DecisionStage::Site,
            action: DecisionAction::Blocked,
            tier: DecisionTier::Rules,
            reason: Some("This page matches restricted keywords.".to_string()),
            latency_ms: 4,
        })
        .await;
    logger
        .log(DecisionLogEntry {
            tab_id: 3,
            domain: "example-news.com".to_string(),
            url: "https://example-news.com/".to_string(),
            stage: DecisionStage::Site,
            action: DecisionAction::Allowed,
            tier: DecisionTier::Remote,
            reason: None,
            latency_ms: 120,
        })
        .await;

    // Wait for the async channel and the writer thread.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let logs = db_client.get_logs(10);
    assert_eq!(logs.len(), 2);

    let blocked = logs
        .iter()
        .find(|l| l.domain == "mangadex.org")
        .expect("blocked entry not found in SQLite DB");
    assert_eq!(blocked.action, DecisionAction::Blocked);
    assert_eq!(blocked.tier, DecisionTier::Rules);
    assert_eq!(
        blocked.reason.as_deref(),
        Some("This page matches restricted keywords.")
    );

    let stats = db_client.get_stats();
    assert_eq!(stats.total_decisions, 2);
    assert_eq!(stats.blocked, 1);
    assert_eq!(stats.remote_calls, 1);
    assert!((stats.avg_remote_latency_ms - 120.0).abs() < f64::EPSILON);
    assert_eq!(stats.top_blocked_domains[0].name, "mangadex.org");
}
