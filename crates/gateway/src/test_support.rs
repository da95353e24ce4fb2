//! Shared fakes for gateway tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use relay_agent::AgentInvoker;
use relay_domain::{Error, Result};

/// Answers `echo: <prompt>`. `hang` times out after 200 ms and prompts
/// starting with `fail:` fail with an execution error.
pub struct EchoInvoker;

impl EchoInvoker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

#[async_trait]
impl AgentInvoker for EchoInvoker {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        if prompt == "hang" {
            tokio::time::sleep(self.timeout()).await;
            return Err(Error::Timeout {
                timeout_secs: self.timeout().as_secs_f64(),
            });
        }
        match prompt.strip_prefix("fail:") {
            Some(detail) => Err(Error::execution(detail)),
            None => Ok(format!("echo: {prompt}")),
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(200)
    }
}
