//! AppState construction shared by `serve` and `run`.

use std::future::Future;
use std::sync::Arc;

use relay_agent::{AgentInvoker, CodexInvoker};
use relay_domain::config::{Config, ConfigSeverity};
use relay_sessions::{ConcurrencyLimiter, SessionLogger, SessionStore};

use crate::bot::BotService;
use crate::state::AppState;

/// Validate config, build the agent invoker and return a fully-wired
/// [`AppState`].
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Agent invoker ────────────────────────────────────────────────
    let invoker = Arc::new(CodexInvoker::new(config.agent.clone()));
    tracing::info!(
        command = %config.agent.command,
        workdir = %config.agent.workdir.display(),
        timeout_secs = config.agent.timeout_secs,
        "agent invoker ready"
    );

    Ok(build_with_invoker(config, invoker))
}

/// Wire the session core, event log and bot surface around `invoker`.
///
/// Must be called from within a tokio runtime: a shared bot session is
/// created (and its runner spawned) here.
pub fn build_with_invoker(config: Arc<Config>, invoker: Arc<dyn AgentInvoker>) -> AppState {
    // ── Event log ────────────────────────────────────────────────────
    let event_log = config.event_log.enabled.then(|| {
        tracing::info!(dir = %config.event_log.dir.display(), "session event log enabled");
        Arc::new(SessionLogger::new(&config.event_log.dir))
    });

    // ── Session store ────────────────────────────────────────────────
    let response_timeout = config.sessions.response_timeout(invoker.timeout());
    let mut store = SessionStore::new(invoker, response_timeout);
    if let Some(logger) = &event_log {
        store = store.with_logger(Arc::clone(logger));
    }
    let sessions = Arc::new(store);
    tracing::info!(
        response_timeout_ms = response_timeout.as_millis() as u64,
        "session store ready"
    );

    // ── Limiter + bot ────────────────────────────────────────────────
    let limiter = ConcurrencyLimiter::new(config.bot.max_concurrency);
    let bot = config.bot.enabled.then(|| {
        Arc::new(BotService::new(
            config.bot.clone(),
            Arc::clone(&sessions),
            limiter.clone(),
        ))
    });
    if let Some(bot) = &bot {
        tracing::info!(
            policy = ?bot.policy(),
            max_concurrency = limiter.capacity(),
            "bot surface enabled"
        );
    }

    AppState {
        config,
        sessions,
        limiter,
        event_log,
        bot,
    }
}

/// Wait for `signal`, then close every session before returning.
///
/// Used as the server's graceful-shutdown future: callers blocked in
/// `enqueue_input` are released with `SessionClosed` right away instead
/// of holding up the drain until their agent call finishes.
pub async fn close_sessions_on<F>(signal: F, sessions: Arc<SessionStore>)
where
    F: Future<Output = ()>,
{
    signal.await;
    let closed = sessions.close_all();
    tracing::info!(closed, "sessions closed for shutdown");
}
