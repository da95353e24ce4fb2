use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// External agent CLI
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How to launch the external agent.
///
/// Every invocation runs `<command> exec --color=<color> --cd <workdir>`,
/// with `--json` appended when `json_output` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Executable name or path of the agent CLI.
    #[serde(default = "d_command")]
    pub command: String,
    /// Directory the agent operates in (passed via `--cd`).
    #[serde(default = "d_workdir")]
    pub workdir: PathBuf,
    /// Hard wall-clock timeout for one invocation, in seconds.
    #[serde(default = "d_timeout")]
    pub timeout_secs: f64,
    #[serde(default = "d_color")]
    pub color: String,
    #[serde(default = "d_true")]
    pub json_output: bool,
}

/// Longest per-call timeout `validate` accepts: one day.
pub const MAX_AGENT_TIMEOUT_SECS: f64 = 86_400.0;

impl AgentConfig {
    /// The per-call timeout. Never panics: negative or NaN values yield
    /// zero and values too large for a `Duration` saturate.
    pub fn timeout(&self) -> Duration {
        secs_to_duration(self.timeout_secs)
    }
}

pub(super) fn secs_to_duration(secs: f64) -> Duration {
    match Duration::try_from_secs_f64(secs) {
        Ok(d) => d,
        Err(_) if secs > 0.0 => Duration::MAX,
        Err(_) => Duration::ZERO,
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: d_command(),
            workdir: d_workdir(),
            timeout_secs: d_timeout(),
            color: d_color(),
            json_output: true,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_command() -> String {
    "codex".into()
}
fn d_workdir() -> PathBuf {
    PathBuf::from(".")
}
fn d_timeout() -> f64 {
    120.0
}
fn d_color() -> String {
    "never".into()
}
fn d_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_codex_cli() {
        let cfg = AgentConfig::default();
        assert_eq!(cfg.command, "codex");
        assert_eq!(cfg.color, "never");
        assert!(cfg.json_output);
        assert_eq!(cfg.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn fractional_timeout_parses() {
        let cfg: AgentConfig = toml::from_str("timeout_secs = 2.5").unwrap();
        assert_eq!(cfg.timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn out_of_range_timeouts_do_not_panic() {
        let huge = AgentConfig {
            timeout_secs: 1e20,
            ..AgentConfig::default()
        };
        assert_eq!(huge.timeout(), Duration::MAX);

        let infinite = AgentConfig {
            timeout_secs: f64::INFINITY,
            ..AgentConfig::default()
        };
        assert_eq!(infinite.timeout(), Duration::MAX);

        for bad in [-5.0, f64::NAN] {
            let cfg = AgentConfig {
                timeout_secs: bad,
                ..AgentConfig::default()
            };
            assert_eq!(cfg.timeout(), Duration::ZERO);
        }
    }
}
