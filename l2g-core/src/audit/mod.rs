//! Structured audit logging.
//!
//! Engine components emit plain `tracing` events whose message is the event
//! name (`term.created`, `variation.update.direct_meta`, ...). An
//! [`OperationScope`] opens a span carrying the correlation id, the parent id
//! and the operation name; [`layer::AuditLayer`] flattens that span stack plus
//! the event's own fields into one [`AuditRecord`] and hands it to an
//! [`AuditSink`].

pub mod layer;

pub use layer::AuditLayer;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Name of the span opened by [`OperationScope`]
pub const OPERATION_SPAN: &str = "l2g.operation";

/// One flattened audit entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    /// Event name, taken from the event's message
    pub event: String,
    pub target: String,
    /// Span fields (outermost first) merged with the event's own fields
    pub context: Map<String, Value>,
    pub source: String,
}

impl AuditRecord {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.context.get(name)
    }

    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.context.get(name).and_then(Value::as_str)
    }
}

/// Destination for audit records
#[derive(Debug, Clone)]
pub enum AuditSink {
    /// Append-only JSON lines file
    File {
        file: Arc<Mutex<File>>,
        /// Set once the first write failure has been reported
        failed: Arc<AtomicBool>,
    },
    /// In-memory buffer, mostly for assertions in tests
    Memory(Arc<Mutex<Vec<AuditRecord>>>),
}

impl AuditSink {
    pub fn file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::from_file(file))
    }

    pub fn from_file(file: File) -> Self {
        AuditSink::File {
            file: Arc::new(Mutex::new(file)),
            failed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn memory() -> Self {
        AuditSink::Memory(Arc::new(Mutex::new(Vec::new())))
    }

    /// Auditing never fails an operation. The first write failure of a
    /// sink is logged as `audit.write_failed`, later ones are dropped.
    pub fn write(&self, record: AuditRecord) {
        match self {
            AuditSink::File { file, failed } => {
                let result = serde_json::to_string(&record)
                    .map_err(std::io::Error::from)
                    .and_then(|line| {
                        let mut file = file.lock();
                        writeln!(file, "{}", line)?;
                        file.flush()
                    });
                if let Err(e) = result {
                    if !failed.swap(true, Ordering::SeqCst) {
                        tracing::warn!(error = %e, "audit.write_failed");
                    }
                }
            }
            AuditSink::Memory(records) => records.lock().push(record),
        }
    }

    /// Buffered records; always empty for file sinks
    pub fn records(&self) -> Vec<AuditRecord> {
        match self {
            AuditSink::File { .. } => Vec::new(),
            AuditSink::Memory(records) => records.lock().clone(),
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.event).collect()
    }
}

/// Context under which one engine operation runs
#[derive(Debug, Clone)]
pub struct OperationScope {
    pub corr_id: String,
    pub parent_id: i64,
    pub operation: &'static str,
}

impl OperationScope {
    pub fn new(corr_id: impl Into<String>, parent_id: i64, operation: &'static str) -> Self {
        Self {
            corr_id: corr_id.into(),
            parent_id,
            operation,
        }
    }

    /// Run `f` inside the operation span so every event it emits carries the
    /// scope's fields
    pub fn run<T>(&self, f: impl FnOnce() -> T) -> T {
        let span = tracing::info_span!(
            "l2g.operation",
            corr_id = %self.corr_id,
            parent_id = self.parent_id,
            operation = self.operation,
        );
        span.in_scope(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(event: &str) -> AuditRecord {
        AuditRecord {
            timestamp: Utc::now(),
            level: "INFO".to_string(),
            event: event.to_string(),
            target: "test".to_string(),
            context: Map::new(),
            source: crate::LOG_SOURCE.to_string(),
        }
    }

    #[test]
    fn test_memory_sink_buffers_records() {
        let sink = AuditSink::memory();
        sink.write(record("term.created"));
        sink.write(record("term.reuse"));

        assert_eq!(sink.events(), vec!["term.created", "term.reuse"]);
    }

    #[test]
    fn test_file_sink_reports_first_write_failure() {
        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::Registry;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.jsonl");
        fs::write(&path, "").unwrap();
        // read-only handle, every write fails
        let sink = AuditSink::from_file(File::open(&path).unwrap());
        let captured = AuditSink::memory();
        let subscriber = Registry::default().with(AuditLayer::new(captured.clone()));

        tracing::subscriber::with_default(subscriber, || {
            sink.write(record("term.created"));
            sink.write(record("term.reuse"));
        });

        assert_eq!(captured.events(), vec!["audit.write_failed"]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_file_sink_appends_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("audit.jsonl");

        let sink = AuditSink::file(&path).unwrap();
        sink.write(record("backup.created"));
        sink.write(record("backup.restored"));

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: AuditRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.event, "backup.restored");
        assert_eq!(parsed.source, "local2global");
        assert!(sink.records().is_empty());
    }
}
