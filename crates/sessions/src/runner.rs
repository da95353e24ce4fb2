//! The per-session runner task.
//!
//! One runner is spawned per session at creation. It is the only reader of
//! the session's inbound queue and the only writer of `latest_output`.

use std::sync::Arc;

use relay_agent::AgentInvoker;
use relay_domain::Error;
use tokio::sync::mpsc;

use crate::logger::{LogStream, SessionLogger};
use crate::session::{Inbound, Reply, Session};

/// Drain `inbound` until a close item arrives or every sender is gone.
pub(crate) async fn run_session(
    session: Arc<Session>,
    mut inbound: mpsc::UnboundedReceiver<Inbound>,
    invoker: Arc<dyn AgentInvoker>,
    logger: Option<Arc<SessionLogger>>,
) {
    let session_id = session.id().to_string();
    tracing::debug!(session_id = %session_id, "session runner started");

    while let Some(item) = inbound.recv().await {
        let (text, reply) = match item {
            Inbound::Close => break,
            Inbound::Prompt { text, reply } => (text, reply),
        };

        // Prompts queued ahead of a close have already been answered
        // with SessionClosed by their waiters.
        if session.is_closed() {
            break;
        }

        let outcome = match invoker.invoke(&text).await {
            Ok(output) => Reply::Output(output),
            Err(e) if e.is_timeout() => {
                tracing::warn!(session_id = %session_id, error = %e, "agent timed out");
                Reply::Failed(e)
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "agent execution failed");
                Reply::Output(format!("[agent-error] {}", error_detail(&e)))
            }
        };

        if session.is_closed() {
            tracing::debug!(session_id = %session_id, "discarding result for closed session");
            break;
        }

        match &outcome {
            Reply::Output(text) => {
                session.set_latest_output(text);
                if let Some(logger) = &logger {
                    logger.record(&session_id, LogStream::Output, text);
                }
            }
            Reply::Failed(e) => {
                if let Some(logger) = &logger {
                    logger.record(&session_id, LogStream::Status, &format!("failed: {e}"));
                }
            }
        }

        // The waiter may have stopped waiting (soft timeout).
        let _ = reply.send(outcome);
    }

    tracing::debug!(session_id = %session_id, "session runner stopped");
}

fn error_detail(err: &Error) -> String {
    match err {
        Error::Execution(detail) => detail.clone(),
        other => other.to_string(),
    }
}
