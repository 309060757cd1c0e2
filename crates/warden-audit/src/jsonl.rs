//! JSON-lines file sink: one event per line, flushed after every append.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use warden_contracts::{
    audit::AuditEvent,
    error::{GuardError, GuardResult},
};

use crate::sink::AuditSink;

pub struct JsonlAuditSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlAuditSink {
    /// Open `path` for appending, creating it if needed. Existing lines are
    /// never truncated.
    ///
    /// # Errors
    ///
    /// `Fatal` if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> GuardResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| GuardError::fatal(format!("cannot open audit log '{}': {e}", path.display())))?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonlAuditSink {
    fn append(&self, event: &AuditEvent) -> GuardResult<()> {
        let mut line = serde_json::to_vec(event)
            .map_err(|e| GuardError::fatal(format!("audit event is not serializable: {e}")))?;
        line.push(b'\n');

        let mut writer = self
            .writer
            .lock()
            .map_err(|e| GuardError::fatal(format!("audit log lock poisoned: {e}")))?;
        writer
            .write_all(&line)
            .and_then(|()| writer.flush())
            .map_err(|e| GuardError::transient(format!("audit log write failed: {e}")))
    }

    fn flush(&self) -> GuardResult<()> {
        self.writer
            .lock()
            .map_err(|e| GuardError::fatal(format!("audit log lock poisoned: {e}")))?
            .flush()
            .map_err(|e| GuardError::transient(format!("audit log flush failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use warden_contracts::{
        actor::{Actor, Role},
        audit::{actions, AuditEvent, CorrelationId},
        error::GuardError,
    };

    use super::JsonlAuditSink;
    use crate::sink::AuditSink;

    fn event(action: &str) -> AuditEvent {
        let actor = Actor::new("user_001", "admin@example.com", vec![Role::Admin]);
        AuditEvent::new(&CorrelationId::new(), &actor, action, "review_code")
    }

    #[test]
    fn test_one_parseable_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = JsonlAuditSink::open(&path).unwrap();

        sink.append(&event(actions::WORKFLOW_STARTED)).unwrap();
        sink.append(&event(actions::WORKFLOW_FAILED).failed(&GuardError::fatal("boom")))
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let second: AuditEvent = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.action, actions::WORKFLOW_FAILED);
        assert!(!second.success);
        assert_eq!(second.metadata["error_kind"], "fatal");

        let raw: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        for key in ["timestamp", "correlation_id", "actor_id", "actor_handle", "action", "severity"] {
            assert!(raw.get(key).is_some(), "missing key {key}");
        }
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        JsonlAuditSink::open(&path).unwrap().append(&event("a")).unwrap();
        JsonlAuditSink::open(&path).unwrap().append(&event("b")).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_unopenable_path_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonlAuditSink::open(dir.path().join("missing").join("audit.jsonl"))
            .err()
            .unwrap();
        assert_eq!(err.kind(), warden_contracts::error::ErrorKind::Fatal);
    }
}
