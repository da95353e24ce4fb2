use std::sync::Arc;

use relay_domain::config::Config;
use relay_sessions::{ConcurrencyLimiter, SessionLogger, SessionStore};

use crate::bot::BotService;

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    // ── Session core ──────────────────────────────────────────────────
    pub sessions: Arc<SessionStore>,
    /// Global cap on simultaneous agent calls made by the bot surface.
    pub limiter: ConcurrencyLimiter,
    /// `None` when `[event_log] enabled = false`.
    pub event_log: Option<Arc<SessionLogger>>,

    // ── Front doors ───────────────────────────────────────────────────
    /// `None` when `[bot] enabled = false`.
    pub bot: Option<Arc<BotService>>,
}
