//! Subprocess-backed agent invocation.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use relay_domain::config::AgentConfig;
use relay_domain::trace::TraceEvent;
use relay_domain::{Error, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::parse::normalize_output;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Runs one prompt through the external agent and returns its response.
///
/// Implementations must fail with [`Error::Timeout`] when the call exceeds
/// [`timeout`](AgentInvoker::timeout) and with [`Error::Execution`] for
/// anything else that prevents a usable response.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(&self, prompt: &str) -> Result<String>;

    /// Hard per-call timeout.
    fn timeout(&self) -> Duration;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Codex CLI
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Invokes `<command> exec --color=<color> --cd <workdir> [--json]`.
#[derive(Debug, Clone)]
pub struct CodexInvoker {
    config: AgentConfig,
}

impl CodexInvoker {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Arguments passed after the command name.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "exec".to_owned(),
            format!("--color={}", self.config.color),
            "--cd".to_owned(),
            self.config.workdir.display().to_string(),
        ];
        if self.config.json_output {
            args.push("--json".to_owned());
        }
        args
    }
}

#[async_trait]
impl AgentInvoker for CodexInvoker {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        let started = Instant::now();
        let timeout = self.timeout();

        let mut child = Command::new(&self.config.command)
            .args(self.args())
            .current_dir(&self.config.workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::execution(format!("failed to spawn {}: {e}", self.config.command))
            })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Exactly one trailing newline.
        let payload = format!("{}\n", prompt.trim_end_matches('\n'));

        let write_prompt = async move {
            if let Some(mut stdin) = stdin {
                // The agent may exit without reading its input.
                if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                    tracing::debug!(error = %e, "agent stdin closed early");
                }
                let _ = stdin.shutdown().await;
            }
        };

        let collected = tokio::time::timeout(timeout, async {
            let ((), out, err, status) = tokio::join!(
                write_prompt,
                read_pipe(stdout),
                read_pipe(stderr),
                child.wait()
            );
            (out, err, status)
        })
        .await;

        let (out, err, status) = match collected {
            Ok(parts) => parts,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "failed to kill timed-out agent process");
                }
                TraceEvent::AgentTimedOut {
                    command: self.config.command.clone(),
                    timeout_secs: self.config.timeout_secs,
                }
                .emit();
                return Err(Error::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        };

        let status =
            status.map_err(|e| Error::execution(format!("failed waiting for agent: {e}")))?;
        let stdout_text = String::from_utf8_lossy(&out);
        let stderr_text = String::from_utf8_lossy(&err);

        let result = normalize_output(&stdout_text, &stderr_text);

        TraceEvent::AgentInvoked {
            command: self.config.command.clone(),
            prompt_chars: prompt.chars().count(),
            output_chars: result.as_ref().map(|s| s.chars().count()).unwrap_or(0),
            exit_code: status.code(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
        .emit();

        result
    }

    fn timeout(&self) -> Duration {
        self.config.timeout()
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            tracing::debug!(error = %e, "agent output pipe read failed");
        }
    }
    buf
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
