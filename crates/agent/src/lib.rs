//! External agent invocation for agent-relay.
//!
//! One fresh `<command> exec` process per prompt: the prompt goes in on
//! stdin, the process runs under a hard wall-clock timeout, and its
//! line-oriented output is normalized into a single response string.

pub mod invoker;
pub mod parse;

pub use invoker::{AgentInvoker, CodexInvoker};
pub use parse::normalize_output;
