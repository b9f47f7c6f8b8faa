use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the completion backend.
///
/// `Display` yields the backend-supplied message verbatim when there is one, so
/// callers can surface it to the user without further formatting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{message}")]
    Unauthorized { status: u16, message: String },
    #[error("{message}")]
    NotFound { status: u16, message: String },
    #[error("{message}")]
    RateLimited { status: u16, message: String },
    #[error("{message}")]
    ServerError { status: u16, message: String },
    #[error("Invalid response format from API: {0}")]
    MalformedResponse(String),
    #[error("Network error: {0}")]
    NetworkFailure(String),
}

impl ApiError {
    /// Classifies a non-success status together with the message extracted from its body.
    #[must_use]
    pub fn from_status(status: StatusCode, message: String) -> Self {
        let status = status.as_u16();
        match status {
            401 | 403 => ApiError::Unauthorized { status, message },
            404 => ApiError::NotFound { status, message },
            429 => ApiError::RateLimited { status, message },
            _ => ApiError::ServerError { status, message },
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { status, .. }
            | ApiError::NotFound { status, .. }
            | ApiError::RateLimited { status, .. }
            | ApiError::ServerError { status, .. } => Some(*status),
            ApiError::MalformedResponse(_) | ApiError::NetworkFailure(_) => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::NetworkFailure("request timed out".to_string())
        } else if err.is_decode() {
            ApiError::MalformedResponse(err.to_string())
        } else {
            ApiError::NetworkFailure(err.to_string())
        }
    }
}

/// Failure reported by the page-context boundary itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct BridgeError(pub String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("No active tab found")]
    NoActiveTab,
    #[error("Cannot access page content: {0}")]
    ScriptExecutionError(String),
}

/// Missing settings detected locally, before any network traffic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Please set your API key in settings")]
    MissingApiKey,
    #[error("Please select a model in settings")]
    MissingModel,
    #[error("Please enter a valid API URL")]
    MissingBaseUrl,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Settings I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Settings serialization failed: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

/// Every way a summarization or model refresh can end in failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error("No content found on this page")]
    NoContent,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Why a settings save was refused or did not reach storage.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
