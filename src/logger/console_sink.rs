use crate::config::LoggingConfig;
use crate::logger::types::{DecisionAction, DecisionLogEntry, DecisionLogSink, DecisionTier};
use tracing::info;

pub struct ConsoleLogSink {
    config: LoggingConfig,
}

impl ConsoleLogSink {
    pub fn new(config: LoggingConfig) -> Self {
        Self { config }
    }
}

impl DecisionLogSink for ConsoleLogSink {
    fn log(&self, entry: &DecisionLogEntry) {
        if !self.config.enable {
            return;
        }

        let should_log = match entry.action {
            DecisionAction::Blocked => self.config.log_blocked,
            DecisionAction::Allowed => self.config.log_all_decisions,
        };
        if !should_log {
            return;
        }

        if self.config.format == "json" {
            // Structured logging via tracing
            info!(
                target: "nav_decision",
                tab = %entry.tab_id,
                domain = %entry.domain,
                url = %entry.url,
                stage = ?entry.stage,
                action = ?entry.action,
                tier = ?entry.tier,
                reason = ?entry.reason,
                lat = %entry.latency_ms
            );
        } else {
            let tier_str = match entry.tier {
                DecisionTier::Cache => "cached verdict",
                DecisionTier::Rules => "keyword rules",
                DecisionTier::Remote => "remote classifier",
                DecisionTier::Policy => "policy",
                DecisionTier::Manual => "manual override",
            };
            let action_str = match entry.action {
                DecisionAction::Allowed => "allowed",
                DecisionAction::Blocked => "BLOCKED",
            };

            info!(
                "[{:?}] tab {} {} -> {} by {}{} [{}ms]",
                entry.stage,
                entry.tab_id,
                entry.domain,
                action_str,
                tier_str,
                entry
                    .reason
                    .as_deref()
                    .map(|r| format!(" ({})", r))
                    .unwrap_or_default(),
                entry.latency_ms
            );
        }
    }
}
