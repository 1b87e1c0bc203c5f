//! Error types for the support intake service.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Recorder error: {0}")]
    Recorder(#[from] RecorderError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Intake error: {0}")]
    Intake(#[from] IntakeError),
}

/// Configuration-related errors. All of these are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Log header mismatch: expected {expected:?}, found {found:?}")]
    HeaderMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Invalid staff configuration: {0}")]
    InvalidStaff(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Log storage errors.
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("Authentication with {backend} failed: {reason}")]
    Auth { backend: String, reason: String },

    #[error("{backend} request failed (status {status:?}): {message}")]
    Http {
        backend: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Malformed row {index}: {reason}")]
    MalformedRow { index: usize, reason: String },
}

/// Email delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to send email to {to}: {reason}")]
    SendFailed { to: String, reason: String },
}

/// Per-submission errors surfaced to the submitter.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("{0}")]
    Validation(String),

    #[error("Classifier unavailable during {stage}: {source}")]
    ClassifierUnavailable {
        stage: ClassifierStage,
        #[source]
        source: LlmError,
    },

    #[error("Failed to record ticket: {0}")]
    Recorder(#[from] RecorderError),
}

/// Which classifier call failed. Sentiment analysis falls back to defaults
/// instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierStage {
    Department,
    Reply,
}

impl std::fmt::Display for ClassifierStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Department => "department classification",
            Self::Reply => "reply generation",
        };
        f.write_str(label)
    }
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
