//! Connector-facing shapes for `POST /bot/inbound`.
//!
//! Platform connectors (Discord and friends) translate their native events
//! into an [`InboundMessage`] and act on the returned [`OutboundAction`]s.

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inbound
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    pub channel_id: String,
    /// Human-readable channel name, used in the context header.
    #[serde(default)]
    pub channel_name: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    /// Display name of the sender.
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub content: String,
    /// Whether the platform reports an explicit mention of the bot.
    #[serde(default)]
    pub mentions_bot: bool,
    /// The message was written by the bot itself.
    #[serde(default)]
    pub is_bot_author: bool,
    /// The message this one replies to, if any.
    #[serde(default)]
    pub reference: Option<MessageReference>,
    /// Earlier channel messages, oldest first.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    /// Direct (slash-command style) invocation: `content` is the prompt.
    #[serde(default)]
    pub command: bool,
}

/// Resolution state of a replied-to message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MessageReference {
    Resolved {
        #[serde(default)]
        content: String,
    },
    Deleted,
    Missing,
    /// The connector failed to fetch it.
    Unavailable,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    pub author: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_bot: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Outbound
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize)]
pub struct BotResponse {
    /// `false` when the message did not address the bot.
    pub triggered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub actions: Vec<OutboundAction>,
}

impl BotResponse {
    pub fn ignored() -> Self {
        Self {
            triggered: false,
            session_id: None,
            actions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundAction {
    SendText {
        text: String,
        ephemeral: bool,
    },
    SendFile {
        /// Short notice shown alongside the attachment.
        text: String,
        file_name: String,
        content: String,
        ephemeral: bool,
    },
}

impl OutboundAction {
    pub fn text(&self) -> &str {
        match self {
            Self::SendText { text, .. } | Self::SendFile { text, .. } => text,
        }
    }
}
