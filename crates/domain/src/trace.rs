use serde::Serialize;

/// Structured trace events emitted across all agent-relay crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionCreated {
        session_id: String,
    },
    SessionClosed {
        session_id: String,
    },
    AgentInvoked {
        command: String,
        prompt_chars: usize,
        output_chars: usize,
        exit_code: Option<i32>,
        duration_ms: u64,
    },
    AgentTimedOut {
        command: String,
        timeout_secs: f64,
    },
    StaleOutputReturned {
        session_id: String,
        waited_ms: u64,
    },
    BotPromptHandled {
        channel_id: String,
        session_id: String,
        prompt_chars: usize,
        outcome: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "relay_event");
    }
}
