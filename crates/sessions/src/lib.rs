//! Session concurrency core for agent-relay.
//!
//! Each session owns a FIFO inbound queue drained by exactly one runner
//! task, so at most one agent invocation is in flight per session. The
//! store routes caller input to a session and waits (bounded) for the
//! reply that belongs to that input.

pub mod limiter;
pub mod logger;
pub mod runner;
pub mod session;
pub mod store;

pub use limiter::{ConcurrencyLimiter, LimiterPermit};
pub use logger::{LogEntry, LogStream, SessionLogger};
pub use session::{Session, SessionId};
pub use store::SessionStore;
