//! Per-conversation state shared between the store and the runner.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use relay_domain::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub type SessionId = Uuid;

/// An item on a session's inbound queue.
#[derive(Debug)]
pub(crate) enum Inbound {
    /// Run the agent on `text` and deliver the outcome on `reply`.
    Prompt {
        text: String,
        reply: oneshot::Sender<Reply>,
    },
    /// Stop the runner.
    Close,
}

/// Outcome of one inbound prompt.
#[derive(Debug)]
pub(crate) enum Reply {
    /// Agent output, or an `[agent-error]` line for execution failures.
    Output(String),
    /// A failure the caller must see as such (agent timeout).
    Failed(Error),
}

/// One agent session.
///
/// `latest_output` is written only by the session's runner. Replies are
/// delivered through a one-shot slot attached to each prompt, and the
/// runner fills slots strictly in queue order, so the n-th prompt always
/// receives the n-th result.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    latest_output: RwLock<String>,
    inbound: mpsc::UnboundedSender<Inbound>,
    closed: CancellationToken,
}

impl Session {
    pub(crate) fn new(inbound: mpsc::UnboundedSender<Inbound>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            latest_output: RwLock::new(String::new()),
            inbound,
            closed: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Snapshot of the last response the runner produced (empty before
    /// the first one).
    pub fn latest_output(&self) -> String {
        self.latest_output.read().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    pub(crate) fn set_latest_output(&self, output: &str) {
        *self.latest_output.write() = output.to_owned();
    }

    /// Queue an item for the runner. Fails once the runner has exited.
    pub(crate) fn push(&self, item: Inbound) -> Result<(), Inbound> {
        self.inbound.send(item).map_err(|e| e.0)
    }

    pub(crate) fn closed_token(&self) -> &CancellationToken {
        &self.closed
    }

    /// Mark the session closed: pending waiters are released and the
    /// runner stops at its next queue read.
    pub(crate) fn close(&self) {
        self.closed.cancel();
        let _ = self.inbound.send(Inbound::Close);
    }
}
