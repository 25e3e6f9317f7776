use crate::logger::types::{DecisionAction, DecisionLogEntry, DecisionStage, DecisionTier};
use crate::stats::{StatsSnapshot, TopItem};
use rusqlite::{params, Connection, Result};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// Shared read-side client for the decision log database. Writes go through
/// a dedicated [`LogWriter`] connection owned by the sink thread.
pub struct DbClient {
    db_path: String,
    conn: Mutex<Connection>,
}

pub struct LogWriter {
    conn: Connection,
}

fn open(db_path: &str) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(conn)
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

impl DbClient {
    pub fn new(db_path: String) -> Result<Self> {
        let conn = open(&db_path)?;
        Ok(Self {
            db_path,
            conn: Mutex::new(conn),
        })
    }

    pub fn create_log_writer(&self) -> Result<LogWriter> {
        LogWriter::new(&self.db_path)
    }

    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS decision_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                tab_id INTEGER NOT NULL,
                domain TEXT NOT NULL,
                url TEXT NOT NULL,
                stage TEXT NOT NULL,
                action TEXT NOT NULL,
                tier TEXT NOT NULL,
                reason TEXT,
                latency_ms INTEGER
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON decision_logs(timestamp)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_logs_domain ON decision_logs(domain)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_logs_action ON decision_logs(action)",
            [],
        )?;

        info!("SQLite database initialized at {}", self.db_path);
        Ok(())
    }

    pub fn get_stats(&self) -> StatsSnapshot {
        let conn = self.conn.lock().unwrap();

        let count = |query: &str| -> u64 {
            conn.prepare_cached(query)
                .and_then(|mut s| s.query_row([], |r| r.get::<_, i64>(0)))
                .unwrap_or(0) as u64
        };

        let total_decisions = count("SELECT COUNT(*) FROM decision_logs");
        let blocked = count("SELECT COUNT(*) FROM decision_logs WHERE action = 'Blocked'");
        let cache_hits = count("SELECT COUNT(*) FROM decision_logs WHERE tier = 'Cache'");
        let rule_blocks =
            count("SELECT COUNT(*) FROM decision_logs WHERE tier = 'Rules' AND action = 'Blocked'");
        let remote_calls = count("SELECT COUNT(*) FROM decision_logs WHERE tier = 'Remote'");

        let avg_remote_latency_ms: f64 = conn
            .prepare_cached("SELECT AVG(latency_ms) FROM decision_logs WHERE tier = 'Remote'")
            .and_then(|mut s| s.query_row([], |r| r.get::<_, Option<f64>>(0)))
            .ok()
            .flatten()
            .unwrap_or(0.0);

        let get_top = |query: &str| -> Vec<TopItem> {
            let Ok(mut stmt) = conn.prepare_cached(query) else {
                return Vec::new();
            };
            let rows = stmt.query_map([], |row| {
                Ok(TopItem {
                    name: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                })
            });
            match rows {
                Ok(rows) => rows.filter_map(Result::ok).collect(),
                Err(_) => Vec::new(),
            }
        };

        let top_domains = get_top(
            "SELECT domain, COUNT(*) as c FROM decision_logs GROUP BY domain ORDER BY c DESC LIMIT 5",
        );
        let top_blocked_domains = get_top(
            "SELECT domain, COUNT(*) as c FROM decision_logs WHERE action = 'Blocked' GROUP BY domain ORDER BY c DESC LIMIT 5",
        );

        let started_at = count("SELECT MIN(timestamp) FROM decision_logs");
        let updated_at = {
            let max = count("SELECT MAX(timestamp) FROM decision_logs");
            if max > 0 {
                max
            } else {
                now_secs() as u64
            }
        };

        StatsSnapshot {
            total_decisions,
            blocked,
            cache_hits,
            rule_blocks,
            remote_calls,
            avg_remote_latency_ms,
            top_domains,
            top_blocked_domains,
            started_at,
            updated_at,
        }
    }

    pub fn get_logs(&self, limit: usize) -> Vec<DecisionLogEntry> {
        let conn = self.conn.lock().unwrap();

        let Ok(mut stmt) = conn.prepare_cached(
            "SELECT tab_id, domain, url, stage, action, tier, reason, latency_ms
             FROM decision_logs ORDER BY timestamp DESC LIMIT ?",
        ) else {
            return Vec::new();
        };

        let rows = stmt.query_map([limit as i64], |row| {
            let stage: String = row.get(3)?;
            let action: String = row.get(4)?;
            let tier: String = row.get(5)?;
            Ok(DecisionLogEntry {
                tab_id: row.get(0)?,
                domain: row.get(1)?,
                url: row.get(2)?,
                stage: parse_stage(&stage),
                action: parse_action(&action),
                tier: parse_tier(&tier),
                reason: row.get(6)?,
                latency_ms: row.get::<_, i64>(7)? as u64,
            })
        });

        match rows {
            Ok(rows) => rows.filter_map(Result::ok).collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl LogWriter {
    pub fn new(db_path: &str) -> Result<Self> {
        Ok(Self {
            conn: open(db_path)?,
        })
    }

    pub fn insert_log(&mut self, entry: &DecisionLogEntry) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO decision_logs (
                timestamp, tab_id, domain, url, stage, action, tier, reason, latency_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;

        stmt.execute(params![
            now_secs(),
            entry.tab_id,
            entry.domain,
            entry.url,
            format!("{:?}", entry.stage),
            format!("{:?}", entry.action),
            format!("{:?}", entry.tier),
            entry.reason,
            entry.latency_ms as i64,
        ])?;

        Ok(())
    }

    pub fn prune_logs(&mut self, retention_hours: u64) -> Result<()> {
        let cutoff = now_secs() - (retention_hours * 3600) as i64;
        let mut stmt = self
            .conn
            .prepare_cached("DELETE FROM decision_logs WHERE timestamp < ?1")?;
        stmt.execute(params![cutoff])?;
        Ok(())
    }
}

fn parse_stage(s: &str) -> DecisionStage {
    match s {
        "Search" => DecisionStage::Search,
        "Page" => DecisionStage::Page,
        "Manual" => DecisionStage::Manual,
        _ => DecisionStage::Site,
    }
}

fn parse_action(s: &str) -> DecisionAction {
    match s {
        "Blocked" => DecisionAction::Blocked,
        _ => DecisionAction::Allowed,
    }
}

fn parse_tier(s: &str) -> DecisionTier {
    match s {
        "Cache" => DecisionTier::Cache,
        "Rules" => DecisionTier::Rules,
        "Remote" => DecisionTier::Remote,
        "Manual" => DecisionTier::Manual,
        _ => DecisionTier::Policy,
    }
}
