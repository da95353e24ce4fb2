//! Chat-bot front door.
//!
//! Connectors post normalized chat events; the bot decides whether it was
//! addressed, builds the prompt, runs it through the session store under
//! the global concurrency limiter, and returns the replies to send.

pub mod envelope;
pub mod prompt;
pub mod reply;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use relay_domain::config::{BotConfig, SessionPolicy};
use relay_domain::trace::TraceEvent;
use relay_domain::{Error, Result};
use relay_sessions::{ConcurrencyLimiter, SessionId, SessionStore};

use envelope::{BotResponse, InboundMessage, OutboundAction};

const SHARED_ROUTE: &str = "shared";

/// A conversation's session plus what eviction needs to know about it.
struct Route {
    session: SessionId,
    last_used: Instant,
    /// Prompts currently running on this route. Busy routes are never evicted.
    in_flight: usize,
}

pub struct BotService {
    config: BotConfig,
    sessions: Arc<SessionStore>,
    limiter: ConcurrencyLimiter,
    /// Route key -> session. One entry under `single_shared`, at most
    /// `max_thread_sessions` idle-evictable entries under `per_thread`.
    routes: Mutex<HashMap<String, Route>>,
}

impl BotService {
    /// Under `single_shared` the shared session is created immediately.
    pub fn new(config: BotConfig, sessions: Arc<SessionStore>, limiter: ConcurrencyLimiter) -> Self {
        let service = Self {
            config,
            sessions,
            limiter,
            routes: Mutex::new(HashMap::new()),
        };
        if service.config.session_policy == SessionPolicy::SingleShared {
            let mut routes = service.routes.lock();
            let id = service.route_entry(&mut routes, SHARED_ROUTE).session;
            drop(routes);
            tracing::info!(session_id = %id, "shared bot session created");
        }
        service
    }

    pub fn policy(&self) -> SessionPolicy {
        self.config.session_policy
    }

    /// Session currently serving `msg`'s conversation, if one exists.
    pub fn current_session(&self, msg: &InboundMessage) -> Option<SessionId> {
        self.routes.lock().get(&self.route_key(msg)).map(|r| r.session)
    }

    /// Number of conversations that currently own a session.
    pub fn route_count(&self) -> usize {
        self.routes.lock().len()
    }

    /// Process one chat event.
    pub async fn handle(&self, msg: InboundMessage) -> BotResponse {
        if msg.is_bot_author {
            return BotResponse::ignored();
        }
        let ephemeral = msg.command && self.config.ephemeral;

        let extracted = if msg.command {
            msg.content.trim().to_owned()
        } else {
            match prompt::extract_prompt(&msg, &self.config) {
                Some(p) => p,
                None => return BotResponse::ignored(),
            }
        };

        let request = if !extracted.is_empty() {
            extracted
        } else {
            match msg.reference.as_ref().filter(|_| !msg.command) {
                Some(reference) => match prompt::resolve_reference(reference) {
                    Ok(text) => text,
                    Err(notice) => return self.reply(None, reply::notice(notice, ephemeral)),
                },
                None => return self.reply(None, reply::notice(reply::EMPTY_PROMPT, ephemeral)),
            }
        };

        let full_prompt = if msg.command {
            request
        } else {
            let label = msg.channel_name.as_deref().unwrap_or(&msg.channel_id);
            prompt::compose_prompt(&request, &msg.history, self.config.context_message_limit, label)
        };

        let route = self.route_key(&msg);
        tracing::info!(
            channel_id = %msg.channel_id,
            message_id = msg.message_id.as_deref().unwrap_or(""),
            route = %route,
            "bot prompt received"
        );

        let (session_id, result) = self.execute(&route, &full_prompt).await;
        let (action, outcome) = match result {
            Ok(output) => {
                let action = reply::output_action(&output, self.config.message_limit, ephemeral);
                let outcome = match action {
                    OutboundAction::SendFile { .. } => "file",
                    OutboundAction::SendText { .. } => "text",
                };
                (action, outcome)
            }
            Err(e) => {
                tracing::warn!(channel_id = %msg.channel_id, error = %e, "bot prompt failed");
                let outcome = if e.is_timeout() { "timeout" } else { "error" };
                (reply::notice(reply::failure_text(&e), ephemeral), outcome)
            }
        };

        TraceEvent::BotPromptHandled {
            channel_id: msg.channel_id.clone(),
            session_id: session_id.map(|id| id.to_string()).unwrap_or_default(),
            prompt_chars: full_prompt.chars().count(),
            outcome: outcome.to_owned(),
        }
        .emit();

        self.reply(session_id, action)
    }

    /// Run `prompt` on the route's session while holding a limiter slot.
    ///
    /// A session that was closed elsewhere (e.g. `DELETE /sessions/:id`)
    /// is replaced once before giving up.
    async fn execute(&self, route: &str, prompt: &str) -> (Option<SessionId>, Result<String>) {
        let _permit = match self.limiter.acquire().await {
            Ok(p) => p,
            Err(e) => return (None, Err(e)),
        };

        let id = self.checkout(route);
        // Checked back in on drop, so a cancelled request cannot pin the route.
        let _checkout = Checkout { bot: self, route };
        match self.sessions.enqueue_input(&id, prompt).await {
            Err(Error::SessionNotFound(_)) => {
                tracing::info!(route = %route, stale_session = %id, "bot session gone, recreating");
                let id = self.checkout_fresh(route, id);
                (Some(id), self.sessions.enqueue_input(&id, prompt).await)
            }
            other => (Some(id), other),
        }
    }

    fn route_key(&self, msg: &InboundMessage) -> String {
        match self.config.session_policy {
            SessionPolicy::SingleShared => SHARED_ROUTE.to_owned(),
            SessionPolicy::PerThread => match &msg.thread_id {
                Some(thread) => format!("{}/{thread}", msg.channel_id),
                None => msg.channel_id.clone(),
            },
        }
    }

    /// Mark `route` busy and return its open session.
    fn checkout(&self, route: &str) -> SessionId {
        let mut routes = self.routes.lock();
        let entry = self.route_entry(&mut routes, route);
        entry.in_flight += 1;
        entry.session
    }

    /// Replace `stale` on an already checked-out route.
    fn checkout_fresh(&self, route: &str, stale: SessionId) -> SessionId {
        let mut routes = self.routes.lock();
        let entry = self.route_entry(&mut routes, route);
        if entry.session == stale {
            entry.session = self.sessions.create_session().id();
        }
        entry.session
    }

    fn checkin(&self, route: &str) {
        if let Some(entry) = self.routes.lock().get_mut(route) {
            entry.in_flight = entry.in_flight.saturating_sub(1);
            entry.last_used = Instant::now();
        }
    }

    /// Existing route with an open session, or a new one. Adding a route
    /// first evicts idle routes down to the configured bound.
    fn route_entry<'a>(&self, routes: &'a mut HashMap<String, Route>, route: &str) -> &'a mut Route {
        if !routes.contains_key(route) {
            self.evict_idle(routes);
        }
        let entry = routes.entry(route.to_owned()).or_insert_with(|| Route {
            session: self.sessions.create_session().id(),
            last_used: Instant::now(),
            in_flight: 0,
        });
        if self.sessions.get_session(&entry.session).is_none() {
            entry.session = self.sessions.create_session().id();
        }
        entry.last_used = Instant::now();
        entry
    }

    /// Close least recently used idle routes until one more fits.
    fn evict_idle(&self, routes: &mut HashMap<String, Route>) {
        let bound = self.config.max_thread_sessions.max(1);
        while routes.len() >= bound {
            let oldest = routes
                .iter()
                .filter(|(_, r)| r.in_flight == 0)
                .min_by_key(|(_, r)| r.last_used)
                .map(|(key, _)| key.clone());
            let Some(key) = oldest else {
                tracing::warn!(
                    routes = routes.len(),
                    bound,
                    "all bot sessions busy, exceeding max_thread_sessions"
                );
                return;
            };
            if let Some(evicted) = routes.remove(&key) {
                self.sessions.close_session(&evicted.session);
                tracing::info!(route = %key, session_id = %evicted.session, "idle bot session evicted");
            }
        }
    }

    fn reply(&self, session_id: Option<SessionId>, action: OutboundAction) -> BotResponse {
        BotResponse {
            triggered: true,
            session_id: session_id.map(|id| id.to_string()),
            actions: vec![action],
        }
    }
}

struct Checkout<'a> {
    bot: &'a BotService,
    route: &'a str,
}

impl Drop for Checkout<'_> {
    fn drop(&mut self) {
        self.bot.checkin(self.route);
    }
}
