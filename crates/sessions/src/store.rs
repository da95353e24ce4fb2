//! In-memory session registry.
//!
//! Sessions live only as long as the process. The registry lock guards the
//! map structure and is never held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use relay_agent::AgentInvoker;
use relay_domain::error::{Error, Result};
use relay_domain::trace::TraceEvent;
use tokio::sync::{mpsc, oneshot};

use crate::logger::{LogStream, SessionLogger};
use crate::runner::run_session;
use crate::session::{Inbound, Reply, Session, SessionId};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, Arc<Session>>>,
    invoker: Arc<dyn AgentInvoker>,
    response_timeout: Duration,
    logger: Option<Arc<SessionLogger>>,
}

impl SessionStore {
    /// `response_timeout` bounds how long [`enqueue_input`](Self::enqueue_input)
    /// waits for a reply. It should exceed the invoker's own timeout so
    /// agent timeouts surface as errors rather than stale snapshots.
    pub fn new(invoker: Arc<dyn AgentInvoker>, response_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            invoker,
            response_timeout,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<SessionLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    /// Create a session and spawn its runner. Must be called from within
    /// a tokio runtime.
    pub fn create_session(&self) -> Arc<Session> {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Arc::new(Session::new(tx));
        let session_id = session.id().to_string();
        // Recorded before the session is reachable so it precedes any input.
        self.log(&session_id, LogStream::Status, "created");

        {
            let mut sessions = self.sessions.lock();
            sessions.insert(session.id(), Arc::clone(&session));
            tokio::spawn(run_session(
                Arc::clone(&session),
                rx,
                Arc::clone(&self.invoker),
                self.logger.clone(),
            ));
        }

        tracing::info!(session_id = %session_id, "session created");
        TraceEvent::SessionCreated { session_id }.emit();

        session
    }

    pub fn get_session(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.lock().get(id).cloned()
    }

    /// All open sessions, oldest first.
    pub fn list(&self) -> Vec<Arc<Session>> {
        let mut sessions: Vec<_> = self.sessions.lock().values().cloned().collect();
        sessions.sort_by_key(|s| s.created_at());
        sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Send `text` to a session and wait for its reply.
    ///
    /// If no reply arrives within the response timeout, the session's
    /// current `latest_output` is returned instead; the invocation keeps
    /// running and will still update that snapshot when it finishes.
    pub async fn enqueue_input(&self, id: &SessionId, text: &str) -> Result<String> {
        let session = self
            .get_session(id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;

        // Recorded before the runner can see the prompt, so the input line
        // always precedes its output line.
        self.log(&id.to_string(), LogStream::Input, text);

        let (reply_tx, reply_rx) = oneshot::channel();
        session
            .push(Inbound::Prompt {
                text: text.to_owned(),
                reply: reply_tx,
            })
            .map_err(|_| Error::SessionClosed(id.to_string()))?;

        let started = Instant::now();
        let closed = session.closed_token();
        let waited = tokio::time::timeout(self.response_timeout, async {
            tokio::select! {
                biased;
                reply = reply_rx => match reply {
                    Ok(Reply::Output(output)) => Ok(output),
                    Ok(Reply::Failed(e)) => Err(e),
                    // Runner dropped the slot: it stopped for a close.
                    Err(_) => Err(Error::SessionClosed(id.to_string())),
                },
                _ = closed.cancelled() => Err(Error::SessionClosed(id.to_string())),
            }
        })
        .await;

        match waited {
            Ok(result) => result,
            Err(_) => {
                let waited_ms = started.elapsed().as_millis() as u64;
                tracing::warn!(
                    session_id = %id,
                    waited_ms,
                    "no reply within response timeout, returning latest output"
                );
                TraceEvent::StaleOutputReturned {
                    session_id: id.to_string(),
                    waited_ms,
                }
                .emit();
                Ok(session.latest_output())
            }
        }
    }

    /// Remove a session and stop its runner. Returns `false` if the id is
    /// unknown (including a second close of the same id).
    pub fn close_session(&self, id: &SessionId) -> bool {
        let Some(session) = self.sessions.lock().remove(id) else {
            return false;
        };
        session.close();

        let session_id = id.to_string();
        tracing::info!(session_id = %session_id, "session closed");
        TraceEvent::SessionClosed {
            session_id: session_id.clone(),
        }
        .emit();
        self.log(&session_id, LogStream::Status, "closed");
        true
    }

    /// Close every open session. Returns how many were closed.
    pub fn close_all(&self) -> usize {
        let ids: Vec<SessionId> = self.sessions.lock().keys().copied().collect();
        ids.iter().filter(|id| self.close_session(id)).count()
    }

    /// Wait until every event log record queued so far is on disk. A no-op
    /// without a logger.
    pub async fn flush_log(&self) {
        if let Some(logger) = &self.logger {
            logger.flush().await;
        }
    }

    fn log(&self, session_id: &str, stream: LogStream, text: &str) {
        if let Some(logger) = &self.logger {
            logger.record(session_id, stream, text);
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes prompts after an optional delay. Prompts starting with
    /// `fail:` produce an execution error, `hang` sleeps past the timeout.
    struct ScriptedInvoker {
        delay: Duration,
        timeout: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedInvoker {
        fn new(delay_ms: u64, timeout_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                delay: Duration::from_millis(delay_ms),
                timeout: Duration::from_millis(timeout_ms),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl AgentInvoker for ScriptedInvoker {
        async fn invoke(&self, prompt: &str) -> Result<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let result = if prompt == "hang" {
                tokio::time::sleep(self.timeout).await;
                Err(Error::Timeout {
                    timeout_secs: self.timeout.as_secs_f64(),
                })
            } else {
                tokio::time::sleep(self.delay).await;
                match prompt.strip_prefix("fail:") {
                    Some(detail) => Err(Error::execution(detail)),
                    None => Ok(format!("echo: {prompt}")),
                }
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }

        fn timeout(&self) -> Duration {
            self.timeout
        }
    }

    fn store(invoker: Arc<ScriptedInvoker>, response_timeout_ms: u64) -> Arc<SessionStore> {
        Arc::new(SessionStore::new(
            invoker,
            Duration::from_millis(response_timeout_ms),
        ))
    }

    #[tokio::test]
    async fn single_prompt_round_trip() {
        let store = store(ScriptedInvoker::new(0, 1_000), 2_000);
        let session = store.create_session();

        let out = store.enqueue_input(&session.id(), "hello").await.unwrap();
        assert_eq!(out, "echo: hello");
        assert_eq!(session.latest_output(), "echo: hello");
    }

    #[tokio::test]
    async fn concurrent_inputs_are_answered_in_order_one_at_a_time() {
        let invoker = ScriptedInvoker::new(20, 1_000);
        let store = store(invoker.clone(), 5_000);
        let id = store.create_session().id();

        let mut handles = Vec::new();
        for i in 0..5 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.enqueue_input(&id, &format!("msg {i}")).await
            }));
            // Keep push order deterministic.
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        for (i, handle) in handles.into_iter().enumerate() {
            let out = handle.await.unwrap().unwrap();
            assert_eq!(out, format!("echo: msg {i}"));
        }
        assert_eq!(invoker.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sessions_run_in_parallel() {
        let invoker = ScriptedInvoker::new(100, 1_000);
        let store = store(invoker.clone(), 5_000);
        let a = store.create_session().id();
        let b = store.create_session().id();

        let (ra, rb) = tokio::join!(store.enqueue_input(&a, "a"), store.enqueue_input(&b, "b"));
        assert_eq!(ra.unwrap(), "echo: a");
        assert_eq!(rb.unwrap(), "echo: b");
        assert_eq!(invoker.max_in_flight.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let store = store(ScriptedInvoker::new(0, 1_000), 2_000);
        let err = store
            .enqueue_input(&uuid::Uuid::new_v4(), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn create_then_close_then_enqueue_is_not_found() {
        let store = store(ScriptedInvoker::new(0, 1_000), 2_000);
        let id = store.create_session().id();
        assert!(store.close_session(&id));
        let err = store.enqueue_input(&id, "hi").await.unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn close_twice_returns_true_then_false() {
        let store = store(ScriptedInvoker::new(0, 1_000), 2_000);
        let id = store.create_session().id();
        assert!(store.close_session(&id));
        assert!(!store.close_session(&id));
        assert!(store.get_session(&id).is_none());
    }

    #[tokio::test]
    async fn close_while_waiting_is_session_closed() {
        let store = store(ScriptedInvoker::new(500, 1_000), 5_000);
        let id = store.create_session().id();

        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.enqueue_input(&id, "slow").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.close_session(&id));

        let err = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, Error::SessionClosed(_)));
    }

    #[tokio::test]
    async fn execution_error_becomes_agent_error_output() {
        let store = store(ScriptedInvoker::new(0, 1_000), 2_000);
        let session = store.create_session();

        let out = store
            .enqueue_input(&session.id(), "fail:no output produced")
            .await
            .unwrap();
        assert_eq!(out, "[agent-error] no output produced");
        assert_eq!(session.latest_output(), out);

        // The session keeps working afterwards.
        let next = store.enqueue_input(&session.id(), "again").await.unwrap();
        assert_eq!(next, "echo: again");
    }

    #[tokio::test]
    async fn agent_timeout_propagates_and_runner_survives() {
        let store = store(ScriptedInvoker::new(0, 100), 2_000);
        let session = store.create_session();

        let err = store.enqueue_input(&session.id(), "hang").await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(session.latest_output(), "");

        let next = store.enqueue_input(&session.id(), "after").await.unwrap();
        assert_eq!(next, "echo: after");
    }

    #[tokio::test]
    async fn soft_timeout_returns_latest_snapshot() {
        // Store gives up before the agent answers.
        let store = store(ScriptedInvoker::new(300, 1_000), 100);
        let session = store.create_session();
        session.set_latest_output("previous answer");

        let out = store.enqueue_input(&session.id(), "slow").await.unwrap();
        assert_eq!(out, "previous answer");

        // The in-flight call still lands in latest_output.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(session.latest_output(), "echo: slow");
    }

    #[tokio::test]
    async fn close_all_empties_registry() {
        let store = store(ScriptedInvoker::new(0, 1_000), 2_000);
        store.create_session();
        store.create_session();
        assert_eq!(store.len(), 2);
        assert_eq!(store.close_all(), 2);
        assert!(store.is_empty());
    }

    fn streams(logger: &SessionLogger) -> Vec<(LogStream, String)> {
        logger
            .read_day(chrono::Utc::now().date_naive())
            .unwrap()
            .into_iter()
            .map(|e| (e.stream, e.text))
            .collect()
    }

    #[tokio::test]
    async fn logger_records_lifecycle_in_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        let logger = Arc::new(SessionLogger::new(tmp.path()));
        let store = SessionStore::new(ScriptedInvoker::new(0, 1_000), Duration::from_secs(2))
            .with_logger(Arc::clone(&logger));

        let id = store.create_session().id();
        store.enqueue_input(&id, "ping").await.unwrap();
        store.close_session(&id);
        store.flush_log().await;

        assert_eq!(
            streams(&logger),
            vec![
                (LogStream::Status, "created".to_owned()),
                (LogStream::Input, "ping".to_owned()),
                (LogStream::Output, "echo: ping".to_owned()),
                (LogStream::Status, "closed".to_owned()),
            ]
        );
    }

    #[test]
    fn flushed_records_survive_runtime_shutdown() {
        let tmp = tempfile::TempDir::new().unwrap();
        for round in 0..10 {
            let dir = tmp.path().join(format!("round-{round}"));
            let rt = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let logger = Arc::new(SessionLogger::new(&dir));
                let store = SessionStore::new(ScriptedInvoker::new(0, 1_000), Duration::from_secs(2))
                    .with_logger(logger);
                let id = store.create_session().id();
                store.enqueue_input(&id, "ping").await.unwrap();
                store.close_session(&id);
                store.flush_log().await;
            });
            drop(rt);

            let raw = std::fs::read_to_string(
                dir.join(format!("{}.jsonl", chrono::Utc::now().format("%Y-%m-%d"))),
            )
            .unwrap();
            let texts: Vec<String> = raw
                .lines()
                .map(|l| serde_json::from_str::<crate::LogEntry>(l).unwrap().text)
                .collect();
            assert_eq!(texts, ["created", "ping", "echo: ping", "closed"], "round {round}");
        }
    }
}
