//! Append-only fault log.
//!
//! # Responsibility
//! - Record every fault that is caught and not re-raised, with enough
//!   context (operation, record id, message) to diagnose it later.
//!
//! # Invariants
//! - Recording never panics and never returns an error to the caller.
//! - Existing entries are never rewritten; the file only grows.

use crate::clock::Clock;
use crate::logging::sanitize_message;
use crate::model::contact::ContactId;
use log::{error, warn};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const MAX_LOGGED_MESSAGE_CHARS: usize = 240;
const ENTRY_SEPARATOR: &str = "--------------------------------------------------";

/// One diagnosable fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub operation: String,
    pub record_id: Option<ContactId>,
    pub message: String,
}

impl Fault {
    pub fn new(operation: impl Into<String>, message: impl ToString) -> Self {
        Self {
            operation: operation.into(),
            record_id: None,
            message: message.to_string(),
        }
    }

    pub fn for_record(mut self, record_id: ContactId) -> Self {
        self.record_id = Some(record_id);
        self
    }

    fn headline(&self) -> String {
        match self.record_id {
            Some(id) => format!(
                "Error in {} (id={}): {}",
                self.operation, id, self.message
            ),
            None => format!("Error in {}: {}", self.operation, self.message),
        }
    }
}

/// Destination for swallowed faults.
pub trait ErrorSink: Send + Sync {
    fn record(&self, fault: &Fault);
}

/// Error sink appending to a plain-text log file.
pub struct FileErrorSink {
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileErrorSink {
    pub fn new(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, fault: &Fault) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let stamp = self.clock.now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "[{stamp}] {}", fault.headline())?;
        writeln!(file, "{ENTRY_SEPARATOR}")?;
        Ok(())
    }
}

impl ErrorSink for FileErrorSink {
    fn record(&self, fault: &Fault) {
        warn!(
            "event=fault_recorded module=error_sink operation={} record_id={} message={}",
            fault.operation,
            fault
                .record_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            sanitize_message(&fault.message, MAX_LOGGED_MESSAGE_CHARS)
        );
        if let Err(err) = self.append(fault) {
            error!(
                "event=fault_recorded module=error_sink status=error path={} error={}",
                self.path.display(),
                err
            );
        }
    }
}

/// In-memory sink, useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryErrorSink {
    faults: Mutex<Vec<Fault>>,
}

impl MemoryErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> Vec<Fault> {
        self.faults
            .lock()
            .map(|faults| faults.clone())
            .unwrap_or_default()
    }
}

impl ErrorSink for MemoryErrorSink {
    fn record(&self, fault: &Fault) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.push(fault.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorSink, Fault, FileErrorSink};
    use crate::clock::FixedClock;
    use std::sync::Arc;
    use uuid::Uuid;

    #[test]
    fn file_sink_appends_entries_with_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("error_log.txt");
        let clock = Arc::new(FixedClock::on(2025, 11, 14).unwrap());
        let sink = FileErrorSink::new(&path, clock);
        let id = Uuid::new_v4();

        sink.record(&Fault::new("backup", "disk full"));
        sink.record(&Fault::new("merge", "both names empty").for_record(id));

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "[2025-11-14 12:00:00] Error in backup: disk full");
        assert_eq!(
            lines[2],
            format!("[2025-11-14 12:00:00] Error in merge (id={id}): both names empty")
        );
    }
}
