use std::fmt;

use crate::error::PipelineError;

/// The single display slot: the latest summary or the latest failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SummaryState {
    #[default]
    Idle,
    Loading,
    Ready(String),
    Failed(PipelineError),
}

impl SummaryState {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, SummaryState::Loading)
    }

    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        match self {
            SummaryState::Ready(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn failure(&self) -> Option<&PipelineError> {
        match self {
            SummaryState::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Text for the display slot: the summary on success, `Error: ...` on failure.
    #[must_use]
    pub fn display_text(&self) -> String {
        match self {
            SummaryState::Idle | SummaryState::Loading => String::new(),
            SummaryState::Ready(text) => text.clone(),
            SummaryState::Failed(err) => format!("Error: {err}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    #[must_use]
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}
