/// Shared error type used across all agent-relay crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The agent process did not exit within its wall-clock budget.
    #[error("agent did not respond within {timeout_secs:.1} seconds")]
    Timeout { timeout_secs: f64 },

    /// The agent ran but produced nothing usable, or could not be run at all.
    #[error("agent execution failed: {0}")]
    Execution(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// The session was closed while a response was still pending.
    #[error("session closed: {0}")]
    SessionClosed(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Whether this is the agent-timeout condition (as opposed to content
    /// or lookup failures).
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
