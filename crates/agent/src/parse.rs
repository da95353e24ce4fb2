//! Normalization of the agent's stdout/stderr into one response string.
//!
//! Stdout is newline-delimited. Each line is either a JSON object emitted
//! by the CLI's `--json` mode or plain text, which is kept as-is.

use relay_domain::{Error, Result};
use serde_json::Value;

/// Shell noise emitted when the CLI tries to play a sound on a host
/// without `afplay`.
const AFPLAY_SUFFIX: &str = ": line 1: afplay: command not found";
const AFPLAY_MARKER: &str = "afplay: command not found";

/// Stderr banner printed before the CLI starts reading the prompt.
const STDIN_BANNER: &str = "Reading prompt from stdin";

const DEFAULT_ERROR_DETAIL: &str = "agent error";

/// Keys that mark a run-metadata record (the header line of a `--json` run).
const METADATA_KEYS: [&str; 3] = ["model", "provider", "workdir"];

/// Turn raw process output into the response delivered to the caller.
///
/// Content-bearing records from stdout are joined with `\n`. When there are
/// none, trimmed stderr is used, then trimmed stdout; if both are empty the
/// run is an [`Error::Execution`]. Meaningful stderr lines are appended to
/// a content-bearing result under a `[stderr]` marker.
pub fn normalize_output(stdout: &str, stderr: &str) -> Result<String> {
    let messages = extract_messages(stdout);

    if messages.is_empty() {
        let fallback_err = strip_afplay(stderr);
        let fallback_out = strip_afplay(stdout);
        let fallback = match fallback_err.trim() {
            "" => fallback_out.trim().to_owned(),
            err => err.to_owned(),
        };
        if fallback.is_empty() {
            return Err(Error::execution("no output produced"));
        }
        return Ok(fallback);
    }

    let mut response = messages.join("\n");
    let stderr_lines = meaningful_stderr_lines(stderr);
    if !stderr_lines.is_empty() {
        response.push_str("\n[stderr]\n");
        response.push_str(&stderr_lines.join("\n"));
    }
    Ok(response)
}

/// Collect the content-bearing messages from stdout, in order.
pub fn extract_messages(stdout: &str) -> Vec<String> {
    let mut messages = Vec::new();

    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() || line.ends_with(AFPLAY_SUFFIX) {
            continue;
        }

        let record = match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(map)) => map,
            // Anything that is not a JSON object is opaque text.
            _ => {
                messages.push(line.to_owned());
                continue;
            }
        };

        if let Some(Value::Object(msg)) = record.get("msg") {
            match msg.get("type").and_then(Value::as_str) {
                Some("agent_message") => {
                    if let Some(text) = non_empty_str(msg.get("message")) {
                        messages.push(text.to_owned());
                    }
                }
                Some("error") => {
                    let detail = non_empty_str(msg.get("message")).unwrap_or(DEFAULT_ERROR_DETAIL);
                    messages.push(format!("[error] {detail}"));
                }
                _ => {}
            }
            continue;
        }

        if record.get("type").and_then(Value::as_str) == Some("agent-turn-complete") {
            if let Some(text) = non_empty_str(record.get("last-assistant-message")) {
                messages.push(text.to_owned());
            }
            continue;
        }

        if METADATA_KEYS.iter().any(|key| record.contains_key(*key)) {
            continue;
        }
        if record.get("prompt").is_some_and(is_truthy) {
            continue;
        }

        messages.push(line.to_owned());
    }

    messages
}

fn meaningful_stderr_lines(stderr: &str) -> Vec<&str> {
    stderr
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty()
                && !trimmed.starts_with(STDIN_BANNER)
                && !line.contains(AFPLAY_MARKER)
        })
        .collect()
}

fn strip_afplay(text: &str) -> String {
    text.lines()
        .filter(|line| !line.contains(AFPLAY_MARKER))
        .collect::<Vec<_>>()
        .join("\n")
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
