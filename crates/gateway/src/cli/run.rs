//! `agentrelay run`: one-shot execution.
//!
//! Opens a fresh session, sends a single message, prints the agent's
//! reply to stdout and closes the session again. Handy for scripting
//! and for checking an agent setup without starting the server.

use std::sync::Arc;

use relay_domain::config::Config;

use crate::bootstrap;

/// Execute one prompt and print the reply.
pub async fn run(config: Arc<Config>, message: String, json_output: bool) -> anyhow::Result<()> {
    let state = bootstrap::build_app_state(config).await?;

    let session = state.sessions.create_session();
    let id = session.id();
    let result = state.sessions.enqueue_input(&id, &message).await;
    state.sessions.close_session(&id);
    state.sessions.flush_log().await;

    let output = result.map_err(|e| anyhow::anyhow!(e))?;

    if json_output {
        let body = serde_json::json!({
            "session_id": id.to_string(),
            "output": output,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("{}", output.trim_end());
    }

    Ok(())
}
