use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::agent::secs_to_duration;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Session store tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Added to the agent timeout to form the store's response wait bound,
    /// so a genuine agent timeout is reported before the store gives up.
    #[serde(default = "d_margin")]
    pub response_margin_secs: f64,
}

impl SessionsConfig {
    /// The store's soft wait bound for a given agent timeout.
    pub fn response_timeout(&self, agent_timeout: Duration) -> Duration {
        agent_timeout.saturating_add(secs_to_duration(self.response_margin_secs))
    }
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            response_margin_secs: d_margin(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Event log
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Append-only JSONL session event log (one file per UTC day).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    #[serde(default = "d_log_dir")]
    pub dir: PathBuf,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: d_log_dir(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_margin() -> f64 {
    5.0
}
fn d_true() -> bool {
    true
}
fn d_log_dir() -> PathBuf {
    PathBuf::from("./data/sessions")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_timeout_adds_margin() {
        let cfg = SessionsConfig::default();
        assert_eq!(
            cfg.response_timeout(Duration::from_secs(120)),
            Duration::from_secs(125)
        );
    }

    #[test]
    fn negative_margin_is_clamped() {
        let cfg = SessionsConfig {
            response_margin_secs: -3.0,
        };
        assert_eq!(
            cfg.response_timeout(Duration::from_secs(10)),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn huge_values_saturate_instead_of_panicking() {
        let cfg = SessionsConfig {
            response_margin_secs: 1e20,
        };
        assert_eq!(cfg.response_timeout(Duration::from_secs(10)), Duration::MAX);
        assert_eq!(
            SessionsConfig::default().response_timeout(Duration::MAX),
            Duration::MAX
        );
    }
}
