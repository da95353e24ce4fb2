mod agent;
mod bot;
mod observability;
mod server;
mod sessions;

pub use agent::*;
pub use bot::*;
pub use observability::*;
pub use server::*;
pub use sessions::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub event_log: EventLogConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Environment overrides
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub const ENV_AGENT_COMMAND: &str = "RELAY_AGENT_COMMAND";
pub const ENV_AGENT_WORKDIR: &str = "RELAY_AGENT_WORKDIR";
pub const ENV_AGENT_TIMEOUT_SECS: &str = "RELAY_AGENT_TIMEOUT_SECS";

impl Config {
    /// Apply `RELAY_AGENT_*` environment variables on top of the file config.
    ///
    /// Returns the names of the variables that were applied. A timeout value
    /// that does not parse as a number is reported as an error so a typo in
    /// a deployment does not silently fall back to the default.
    pub fn apply_env_overrides(&mut self) -> crate::Result<Vec<&'static str>> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Same as [`apply_env_overrides`](Self::apply_env_overrides) but reads
    /// values through `lookup`, which keeps tests off the process environment.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> crate::Result<Vec<&'static str>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();

        if let Some(cmd) = lookup(ENV_AGENT_COMMAND).filter(|v| !v.trim().is_empty()) {
            self.agent.command = cmd;
            applied.push(ENV_AGENT_COMMAND);
        }
        if let Some(dir) = lookup(ENV_AGENT_WORKDIR).filter(|v| !v.trim().is_empty()) {
            self.agent.workdir = PathBuf::from(dir);
            applied.push(ENV_AGENT_WORKDIR);
        }
        if let Some(raw) = lookup(ENV_AGENT_TIMEOUT_SECS).filter(|v| !v.trim().is_empty()) {
            let secs: f64 = raw.trim().parse().map_err(|_| {
                crate::Error::Config(format!(
                    "{ENV_AGENT_TIMEOUT_SECS} must be a number of seconds, got {raw:?}"
                ))
            })?;
            self.agent.timeout_secs = secs;
            applied.push(ENV_AGENT_TIMEOUT_SECS);
        }

        Ok(applied)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }
        if self.server.max_concurrent_requests == 0 {
            errors.push(ConfigError::error(
                "server.max_concurrent_requests",
                "must be at least 1",
            ));
        }

        // CORS: warn if wildcard is used.
        if self.server.cors.allowed_origins.len() == 1
            && self.server.cors.allowed_origins[0] == "*"
        {
            errors.push(ConfigError::warning(
                "server.cors.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            ));
        }

        if self.agent.command.trim().is_empty() {
            errors.push(ConfigError::error("agent.command", "command must not be empty"));
        }
        if !(1.0..=MAX_AGENT_TIMEOUT_SECS).contains(&self.agent.timeout_secs) {
            errors.push(ConfigError::error(
                "agent.timeout_secs",
                format!(
                    "must be between 1.0 and {MAX_AGENT_TIMEOUT_SECS} seconds, got {}",
                    self.agent.timeout_secs
                ),
            ));
        }
        if !self.agent.workdir.is_dir() {
            errors.push(ConfigError::warning(
                "agent.workdir",
                format!("{} does not exist or is not a directory", self.agent.workdir.display()),
            ));
        }

        if !(0.0..=MAX_AGENT_TIMEOUT_SECS).contains(&self.sessions.response_margin_secs) {
            errors.push(ConfigError::error(
                "sessions.response_margin_secs",
                format!("must be between 0.0 and {MAX_AGENT_TIMEOUT_SECS} seconds"),
            ));
        }

        if self.bot.max_concurrency == 0 {
            errors.push(ConfigError::error("bot.max_concurrency", "must be at least 1"));
        }
        if self.bot.max_thread_sessions == 0 {
            errors.push(ConfigError::error("bot.max_thread_sessions", "must be at least 1"));
        }
        if self.bot.message_limit == 0 {
            errors.push(ConfigError::error("bot.message_limit", "must be greater than 0"));
        }
        if self.bot.enabled && self.bot.trigger_prefix.trim().is_empty() && self.bot.bot_user_id.is_none()
        {
            errors.push(ConfigError::warning(
                "bot.trigger_prefix",
                "no trigger prefix and no bot_user_id: only auto channels and commands will trigger",
            ));
        }

        self.observability.validate_into(&mut errors);

        errors
    }
}
