pub mod config;
pub mod run;

use anyhow::Context;
use clap::{Parser, Subcommand};

use relay_domain::config::Config;

/// agentrelay: multiplex chat and HTTP clients onto agent CLI sessions.
#[derive(Debug, Parser)]
#[command(name = "agentrelay", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server (default when no subcommand is given).
    Serve,
    /// Send one message to a fresh session, print the reply and exit.
    Run {
        /// The message to send.
        message: String,
        /// Print `{"session_id", "output"}` as JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

pub const CONFIG_ENV: &str = "RELAY_CONFIG";

/// Load the configuration from the path in `RELAY_CONFIG` (or
/// `config.toml` by default), then apply `RELAY_AGENT_*` overrides.
/// A missing file yields the defaults. Returns the config and the path
/// that was used.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "config.toml".into());
    let mut config = load_config_from(&config_path)?;
    let applied = config
        .apply_env_overrides()
        .context("applying environment overrides")?;
    for var in applied {
        tracing::debug!(var, "config override from environment");
    }
    Ok((config, config_path))
}

/// Parse the TOML file at `path`; defaults when it does not exist.
pub fn load_config_from(path: &str) -> anyhow::Result<Config> {
    if !std::path::Path::new(path).exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    toml::from_str(&raw).with_context(|| format!("parsing {path}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config_from("/definitely/not/here/config.toml").unwrap();
        assert_eq!(config.agent.command, "codex");
    }

    #[test]
    fn file_is_parsed() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[agent]\ncommand = \"my-agent\"\ntimeout_secs = 30.0\n").unwrap();
        let config = load_config_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.agent.command, "my-agent");
        assert_eq!(config.agent.timeout_secs, 30.0);
    }

    #[test]
    fn invalid_toml_names_the_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[agent\ncommand = ").unwrap();
        let err = load_config_from(path.to_str().unwrap()).unwrap_err();
        assert!(format!("{err:#}").contains("broken.toml"));
    }

    #[test]
    fn cli_parses_run_and_config_commands() {
        let cli = Cli::parse_from(["agentrelay", "run", "hello world", "--json"]);
        assert!(matches!(
            cli.command,
            Some(Command::Run { ref message, json: true }) if message == "hello world"
        ));

        let cli = Cli::parse_from(["agentrelay", "config", "validate"]);
        assert!(matches!(cli.command, Some(Command::Config(ConfigCommand::Validate))));

        let cli = Cli::parse_from(["agentrelay"]);
        assert!(cli.command.is_none());
    }
}
