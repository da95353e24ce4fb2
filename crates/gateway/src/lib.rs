//! agent-relay gateway: HTTP API, chat-bot surface, and CLI plumbing on top
//! of the session core.

pub mod api;
pub mod bootstrap;
pub mod bot;
pub mod cli;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;
