//! In-memory, exportable record of what the pipeline did.
//!
//! Nothing is recorded while diagnostics are disabled. Entries are redacted
//! before they are stored, never afterwards.

pub mod redact;

use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use self::redact::{redact_text, redact_value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Info,
    Warning,
    Error,
    Success,
    ActionStart,
    Request,
    Response,
    Notification,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: LogKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// A serialized log ready to be written out under `file_name`.
#[derive(Debug, Clone)]
pub struct LogExport {
    pub file_name: String,
    pub contents: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct DiagnosticLog {
    enabled: AtomicBool,
    entries: Mutex<Vec<LogEntry>>,
}

impl DiagnosticLog {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn record(&self, kind: LogKind, message: impl AsRef<str>, payload: Option<Value>) {
        if !self.is_enabled() {
            return;
        }
        let entry = LogEntry {
            timestamp: Utc::now(),
            kind,
            message: redact_text(message.as_ref()).into_owned(),
            payload: payload.map(redact_value),
        };
        debug!(?kind, payload = ?entry.payload, "{}", entry.message);
        self.lock().push(entry);
    }

    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// # Errors
    /// Returns an error if an entry payload cannot be serialized.
    pub fn export(&self) -> Result<LogExport, serde_json::Error> {
        self.export_at(Utc::now())
    }

    /// # Errors
    /// Returns an error if an entry payload cannot be serialized.
    pub fn export_at(&self, exported_at: DateTime<Utc>) -> Result<LogExport, serde_json::Error> {
        let contents = serde_json::to_vec_pretty(&*self.lock())?;
        Ok(LogExport {
            file_name: export_file_name(exported_at),
            contents,
        })
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `summarizer-debug-log-2024-05-01T10-20-30-123Z.json`
#[must_use]
pub fn export_file_name(exported_at: DateTime<Utc>) -> String {
    let stamp = exported_at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("summarizer-debug-log-{stamp}.json")
}
