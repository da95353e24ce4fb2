//! Shared types for agent-relay: the error taxonomy, the configuration
//! model and structured trace events.

pub mod config;
pub mod error;
pub mod trace;

pub use error::{Error, Result};
