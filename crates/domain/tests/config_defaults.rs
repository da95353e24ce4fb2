use relay_domain::config::{Config, SessionPolicy};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8000);
}

#[test]
fn explicit_zero_host_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 3210
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 3210);
}

#[test]
fn default_cors_allows_only_localhost() {
    let config = Config::default();
    assert!(config.server.cors.allowed_origins.contains(&"http://localhost:*".to_string()));
    assert!(config.server.cors.allowed_origins.contains(&"http://127.0.0.1:*".to_string()));
}

#[test]
fn empty_file_yields_codex_defaults() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config.agent.command, "codex");
    assert_eq!(config.agent.timeout_secs, 120.0);
    assert_eq!(config.sessions.response_margin_secs, 5.0);
    assert!(config.event_log.enabled);
    assert!(!config.bot.enabled);
}

#[test]
fn full_file_parses_every_section() {
    let toml_str = r#"
[server]
port = 9000

[agent]
command = "/usr/local/bin/codex"
workdir = "/srv/repo"
timeout_secs = 30.0
json_output = false

[sessions]
response_margin_secs = 2.5

[event_log]
enabled = false
dir = "/var/log/agentrelay"

[bot]
enabled = true
max_concurrency = 4
session_policy = "per_thread"
trigger_prefix = "!agent"
message_limit = 1500
bot_user_id = "998877"

[observability]
service_name = "agentrelay-prod"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.agent.command, "/usr/local/bin/codex");
    assert!(!config.agent.json_output);
    assert_eq!(config.sessions.response_margin_secs, 2.5);
    assert!(!config.event_log.enabled);
    assert_eq!(config.bot.max_concurrency, 4);
    assert_eq!(config.bot.session_policy, SessionPolicy::PerThread);
    assert_eq!(config.bot.trigger_prefix, "!agent");
    assert_eq!(config.bot.bot_user_id.as_deref(), Some("998877"));
    assert_eq!(config.observability.service_name, "agentrelay-prod");
}

#[test]
fn config_round_trips_through_toml() {
    let config = Config::default();
    let rendered = toml::to_string_pretty(&config).unwrap();
    let parsed: Config = toml::from_str(&rendered).unwrap();
    assert_eq!(parsed.agent.command, config.agent.command);
    assert_eq!(parsed.bot.trigger_prefix, config.bot.trigger_prefix);
}
