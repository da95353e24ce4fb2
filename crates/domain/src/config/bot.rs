use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Chat bot surface
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Chat-bot front door configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Mount `POST /bot/inbound` and create the bot's session(s).
    #[serde(default)]
    pub enabled: bool,
    /// Global cap on simultaneous agent invocations issued by the bot.
    #[serde(default = "d_2")]
    pub max_concurrency: usize,
    #[serde(default)]
    pub session_policy: SessionPolicy,
    /// Under `per_thread`, the most conversation sessions kept open. The
    /// least recently used idle one is closed to make room for a new one.
    #[serde(default = "d_max_thread_sessions")]
    pub max_thread_sessions: usize,
    /// Messages starting with this prefix trigger the bot.
    #[serde(default = "d_prefix")]
    pub trigger_prefix: String,
    /// Channels where every message triggers the bot (no prefix/mention needed).
    #[serde(default)]
    pub auto_channel_ids: Vec<String>,
    /// How many prior channel messages to prepend as context (0 = none).
    #[serde(default)]
    pub context_message_limit: usize,
    /// Responses longer than this are sent as a file attachment.
    #[serde(default = "d_1900")]
    pub message_limit: usize,
    /// The bot's own user id, used to detect and strip `<@id>` mentions.
    #[serde(default)]
    pub bot_user_id: Option<String>,
    /// Ask the connector to send slash-command replies ephemerally.
    #[serde(default)]
    pub ephemeral: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_concurrency: 2,
            session_policy: SessionPolicy::default(),
            max_thread_sessions: d_max_thread_sessions(),
            trigger_prefix: d_prefix(),
            auto_channel_ids: Vec::new(),
            context_message_limit: 0,
            message_limit: 1900,
            bot_user_id: None,
            ephemeral: false,
        }
    }
}

/// How bot conversations map onto agent sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPolicy {
    /// One long-lived session, created at bot start, shared by every chat.
    #[default]
    SingleShared,
    /// One session per channel/thread, created on first use.
    PerThread,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_2() -> usize {
    2
}
fn d_max_thread_sessions() -> usize {
    64
}
fn d_prefix() -> String {
    "!codex".into()
}
fn d_1900() -> usize {
    1900
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_single_shared() {
        let cfg = BotConfig::default();
        assert_eq!(cfg.session_policy, SessionPolicy::SingleShared);
        assert!(!cfg.enabled);
        assert_eq!(cfg.message_limit, 1900);
        assert_eq!(cfg.max_thread_sessions, 64);
    }

    #[test]
    fn per_thread_policy_parses() {
        let toml_str = r#"
            enabled = true
            session_policy = "per_thread"
            auto_channel_ids = ["123", "456"]
            context_message_limit = 5
            max_thread_sessions = 8
        "#;
        let cfg: BotConfig = toml::from_str(toml_str).unwrap();
        assert!(cfg.enabled);
        assert_eq!(cfg.session_policy, SessionPolicy::PerThread);
        assert_eq!(cfg.auto_channel_ids, vec!["123", "456"]);
        assert_eq!(cfg.context_message_limit, 5);
        assert_eq!(cfg.max_thread_sessions, 8);
        assert_eq!(cfg.trigger_prefix, "!codex");
    }
}
