//! Error types shared by the API adapters and the wizard
use thiserror::Error;

/// Errors raised while talking to the gate API
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// Transport-level failure (DNS, connect, timeout, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// The API answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded
    #[error("Failed to parse response: {0}")]
    Decode(String),

    /// A field the caller relies on was missing from the response
    #[error("Missing field in response: {0}")]
    MissingField(&'static str),

    /// The request task died before producing a response
    #[error("Request aborted: {0}")]
    Aborted(String),
}

/// Errors surfaced by the server group wizard
#[derive(Debug, Error)]
pub enum WizardError {
    #[error("Wizard was dismissed")]
    Dismissed,

    #[error("Template selection is still pending")]
    TemplateSelectionPending,

    #[error("A server group task is already running")]
    TaskInFlight,

    #[error("Server group task failed: {0}")]
    TaskFailed(String),

    #[error("{page}: {}", errors.join("; "))]
    Validation {
        page: &'static str,
        errors: Vec<String>,
    },

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = WizardError> = std::result::Result<T, E>;

impl WizardError {
    pub fn invalid_command(msg: impl Into<String>) -> Self {
        WizardError::InvalidCommand(msg.into())
    }
}
