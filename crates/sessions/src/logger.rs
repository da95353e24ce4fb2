//! Append-only JSONL session event log.
//!
//! One `<YYYY-MM-DD>.jsonl` file per UTC day under the configured
//! directory. Every line records a session id, a stream kind, and text.
//!
//! Events are timestamped where they happen and handed to a single writer
//! task over a channel, so lines land in the order they were recorded.
//! File I/O runs on the blocking pool. [`SessionLogger::flush`] waits until
//! everything recorded so far is on disk.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use relay_domain::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// What kind of event a log line records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    Input,
    Output,
    Status,
}

/// A single log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub session_id: String,
    pub stream: LogStream,
    pub text: String,
}

enum WriterCommand {
    Append {
        at: DateTime<Utc>,
        entry: LogEntry,
        done: Option<oneshot::Sender<Result<()>>>,
    },
    Flush(oneshot::Sender<()>),
}

pub struct SessionLogger {
    dir: PathBuf,
    tx: mpsc::UnboundedSender<WriterCommand>,
}

impl SessionLogger {
    /// Spawns the writer task, so this must run inside a tokio runtime.
    /// The writer stops once the logger is dropped and its queue drained.
    pub fn new(dir: &Path) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(dir.to_path_buf(), rx));
        Self {
            dir: dir.to_path_buf(),
            tx,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds the events for `date`.
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        day_file(&self.dir, date)
    }

    /// Append one event, timestamped now, and wait for the write.
    pub async fn log_event(&self, session_id: &str, stream: LogStream, text: &str) -> Result<()> {
        self.log_event_at(Utc::now(), session_id, stream, text).await
    }

    async fn log_event_at(
        &self,
        at: DateTime<Utc>,
        session_id: &str,
        stream: LogStream,
        text: &str,
    ) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.send(at, session_id, stream, text, Some(done_tx))?;
        done_rx.await.map_err(|_| writer_gone())?
    }

    /// Queue one event, timestamped now, without waiting for the write.
    /// Failures are reported through `tracing` only.
    pub fn record(&self, session_id: &str, stream: LogStream, text: &str) {
        if let Err(e) = self.send(Utc::now(), session_id, stream, text, None) {
            tracing::warn!(session_id = %session_id, error = %e, "session event dropped");
        }
    }

    /// Wait until every event recorded before this call has been written.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(WriterCommand::Flush(ack_tx)).is_err() || ack_rx.await.is_err() {
            tracing::warn!(dir = %self.dir.display(), "session event log writer already stopped");
        }
    }

    fn send(
        &self,
        at: DateTime<Utc>,
        session_id: &str,
        stream: LogStream,
        text: &str,
        done: Option<oneshot::Sender<Result<()>>>,
    ) -> Result<()> {
        let entry = LogEntry {
            timestamp: at.to_rfc3339(),
            session_id: session_id.to_owned(),
            stream,
            text: text.to_owned(),
        };
        self.tx
            .send(WriterCommand::Append { at, entry, done })
            .map_err(|_| writer_gone())
    }

    /// Read back every entry recorded for `date`.
    pub fn read_day(&self, date: NaiveDate) -> Result<Vec<LogEntry>> {
        let path = self.path_for(date);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&path)?;
        raw.lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(Error::from))
            .collect()
    }
}

// ── Writer task ──────────────────────────────────────────────────────

fn day_file(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}.jsonl", date.format("%Y-%m-%d")))
}

fn writer_gone() -> Error {
    Error::Other("session event log writer stopped".into())
}

async fn run_writer(dir: PathBuf, mut rx: mpsc::UnboundedReceiver<WriterCommand>) {
    while let Some(command) = rx.recv().await {
        match command {
            WriterCommand::Append { at, entry, done } => {
                let result = append(&dir, at, &entry).await;
                match done {
                    Some(done) => {
                        let _ = done.send(result);
                    }
                    None => {
                        if let Err(e) = result {
                            tracing::warn!(
                                session_id = %entry.session_id,
                                error = %e,
                                "session event log write failed"
                            );
                        }
                    }
                }
            }
            WriterCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    tracing::debug!(dir = %dir.display(), "session event log writer stopped");
}

async fn append(dir: &Path, at: DateTime<Utc>, entry: &LogEntry) -> Result<()> {
    let mut line = serde_json::to_string(entry)?;
    line.push('\n');

    let dir = dir.to_path_buf();
    let path = day_file(&dir, at.date_naive());
    tokio::task::spawn_blocking(move || {
        use std::io::Write;
        std::fs::create_dir_all(&dir)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        file.write_all(line.as_bytes())?;
        Ok::<(), Error>(())
    })
    .await
    .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[tokio::test]
    async fn appends_jsonl_lines_in_order() {
        let tmp = TempDir::new().unwrap();
        let logger = SessionLogger::new(&tmp.path().join("sessions"));

        logger.log_event("s1", LogStream::Status, "created").await.unwrap();
        logger.log_event("s1", LogStream::Input, "hello").await.unwrap();
        logger.log_event("s1", LogStream::Output, "hi there").await.unwrap();

        let entries = logger.read_day(Utc::now().date_naive()).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].stream, LogStream::Status);
        assert_eq!(entries[1].text, "hello");
        assert_eq!(entries[2].stream, LogStream::Output);
        assert!(entries.iter().all(|e| e.session_id == "s1"));
    }

    #[tokio::test]
    async fn files_are_split_by_utc_day() {
        let tmp = TempDir::new().unwrap();
        let logger = SessionLogger::new(tmp.path());

        let day1 = Utc.with_ymd_and_hms(2025, 3, 1, 23, 59, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2025, 3, 2, 0, 1, 0).unwrap();
        logger.log_event_at(day1, "a", LogStream::Input, "x").await.unwrap();
        logger.log_event_at(day2, "a", LogStream::Input, "y").await.unwrap();

        assert!(tmp.path().join("2025-03-01.jsonl").exists());
        assert!(tmp.path().join("2025-03-02.jsonl").exists());
        assert_eq!(logger.read_day(day2.date_naive()).unwrap()[0].text, "y");
    }

    #[tokio::test]
    async fn stream_serializes_lowercase() {
        let tmp = TempDir::new().unwrap();
        let logger = SessionLogger::new(tmp.path());
        let now = Utc::now();
        logger.log_event_at(now, "s", LogStream::Output, "done").await.unwrap();

        let raw = std::fs::read_to_string(logger.path_for(now.date_naive())).unwrap();
        let value: serde_json::Value = serde_json::from_str(raw.trim()).unwrap();
        assert_eq!(value["stream"], "output");
        assert_eq!(value["session_id"], "s");
        assert!(value["timestamp"].is_string());
    }

    #[tokio::test]
    async fn recorded_events_keep_order_and_call_site_time() {
        let tmp = TempDir::new().unwrap();
        let logger = SessionLogger::new(tmp.path());

        let before = Utc::now();
        for i in 0..50 {
            logger.record("s1", LogStream::Input, &format!("line {i}"));
        }
        let after = Utc::now();
        logger.flush().await;

        let entries = logger.read_day(before.date_naive()).unwrap();
        let texts: Vec<_> = entries.iter().map(|e| e.text.clone()).collect();
        let expected: Vec<_> = (0..50).map(|i| format!("line {i}")).collect();
        assert_eq!(texts, expected);

        for entry in &entries {
            let ts = DateTime::parse_from_rfc3339(&entry.timestamp)
                .unwrap()
                .with_timezone(&Utc);
            assert!(ts >= before && ts <= after);
        }
    }

    #[tokio::test]
    async fn write_failure_is_returned_to_awaiting_caller() {
        let tmp = TempDir::new().unwrap();
        // A regular file where the log directory should be.
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();
        let logger = SessionLogger::new(&blocker);

        assert!(logger.log_event("s", LogStream::Status, "created").await.is_err());
        // Fire-and-forget failures only warn; the writer keeps going.
        logger.record("s", LogStream::Status, "closed");
        logger.flush().await;
    }

    #[tokio::test]
    async fn missing_day_reads_empty() {
        let tmp = TempDir::new().unwrap();
        let logger = SessionLogger::new(tmp.path());
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert!(logger.read_day(date).unwrap().is_empty());
    }
}
