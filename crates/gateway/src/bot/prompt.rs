//! Prompt extraction and context composition for chat messages.

use relay_domain::config::BotConfig;

use super::envelope::{HistoryEntry, InboundMessage, MessageReference};

pub const REFERENCE_DELETED: &str = "The replied-to message was deleted, so it cannot be run.";
pub const REFERENCE_MISSING: &str = "The replied-to message could not be found.";
pub const REFERENCE_UNAVAILABLE: &str = "Failed to fetch the replied-to message.";
pub const REFERENCE_EMPTY: &str = "The replied-to message has no text.";

/// Decide whether `msg` addresses the bot and pull out its prompt.
///
/// Returns `None` when the bot is not addressed. `Some("")` means the bot
/// was addressed without any prompt text.
///
/// - In an auto channel every message counts: bot mentions are stripped,
///   then an optional trigger prefix.
/// - Elsewhere the trigger prefix wins, then a mention of the bot.
pub fn extract_prompt(msg: &InboundMessage, config: &BotConfig) -> Option<String> {
    let content = msg.content.trim();
    if content.is_empty() {
        return None;
    }
    let bot_id = config.bot_user_id.as_deref();
    let prefix = config.trigger_prefix.as_str();

    if config.auto_channel_ids.iter().any(|id| *id == msg.channel_id) {
        let sanitized = strip_bot_mentions(content, bot_id);
        let sanitized = sanitized.trim();
        let sanitized = match strip_prefix(sanitized, prefix) {
            Some(rest) => rest,
            None => sanitized,
        };
        return Some(sanitized.trim().to_owned());
    }

    if let Some(rest) = strip_prefix(content, prefix) {
        return Some(rest.trim().to_owned());
    }

    if msg.mentions_bot || mentions(content, bot_id) {
        return Some(strip_bot_mentions(content, bot_id).trim().to_owned());
    }

    None
}

/// Text of a replied-to message, or the notice to send instead.
pub fn resolve_reference(reference: &MessageReference) -> Result<String, &'static str> {
    match reference {
        MessageReference::Resolved { content } => {
            let content = content.trim();
            if content.is_empty() {
                Err(REFERENCE_EMPTY)
            } else {
                Ok(content.to_owned())
            }
        }
        MessageReference::Deleted => Err(REFERENCE_DELETED),
        MessageReference::Missing => Err(REFERENCE_MISSING),
        MessageReference::Unavailable => Err(REFERENCE_UNAVAILABLE),
    }
}

/// Prepend recent channel history to `prompt`.
///
/// Only the last `limit` history entries are considered; bot-authored and
/// blank entries among them are skipped. With nothing left the prompt is
/// returned unchanged.
pub fn compose_prompt(
    prompt: &str,
    history: &[HistoryEntry],
    limit: usize,
    channel_label: &str,
) -> String {
    if limit == 0 {
        return prompt.to_owned();
    }

    let start = history.len().saturating_sub(limit);
    let entries: Vec<_> = history[start..]
        .iter()
        .filter(|h| !h.is_bot && !h.content.trim().is_empty())
        .collect();
    if entries.is_empty() {
        return prompt.to_owned();
    }

    let mut lines = Vec::with_capacity(entries.len() + 4);
    lines.push(format!("# Conversation context from {channel_label}"));
    for entry in entries {
        lines.push(format!("- {}: {}", entry.author, entry.content.trim()));
    }
    lines.push(String::new());
    lines.push("# User request".to_owned());
    lines.push(prompt.to_owned());
    lines.join("\n")
}

fn strip_prefix<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return None;
    }
    text.strip_prefix(prefix)
}

fn mentions(content: &str, bot_id: Option<&str>) -> bool {
    match bot_id {
        Some(id) => content.contains(&format!("<@{id}>")) || content.contains(&format!("<@!{id}>")),
        None => false,
    }
}

fn strip_bot_mentions(content: &str, bot_id: Option<&str>) -> String {
    match bot_id {
        Some(id) => content
            .replace(&format!("<@{id}>"), "")
            .replace(&format!("<@!{id}>"), ""),
        None => content.to_owned(),
    }
}
