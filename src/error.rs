use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(code(meetscribe::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(meetscribe::config))]
    Config(String),

    #[error("Calendar provider error: {0}")]
    #[diagnostic(code(meetscribe::calendar))]
    Calendar(String),

    /// Bot provider returned a 4xx/5xx with a structured reason
    #[error("Bot provider rejected dispatch ({status}): {detail}")]
    #[diagnostic(code(meetscribe::bot_rejected))]
    BotRejected { status: u16, detail: String },

    /// Bot provider was unreachable (no HTTP response at all)
    #[error("Bot provider transport error: {0}")]
    #[diagnostic(code(meetscribe::bot_transport))]
    BotTransport(String),

    #[error("Messaging error: {0}")]
    #[diagnostic(code(meetscribe::messaging))]
    Messaging(String),

    #[error("Repository error: {0}")]
    #[diagnostic(code(meetscribe::repository))]
    Repository(String),

    #[error("Cache error: {0}")]
    #[diagnostic(code(meetscribe::cache))]
    Cache(String),

    #[error("Component error: {0}")]
    #[diagnostic(code(meetscribe::component))]
    Component(String),

    #[error(transparent)]
    #[diagnostic(code(meetscribe::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(meetscribe::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(meetscribe::other))]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type BotResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
#[allow(dead_code)]
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create component errors
#[allow(dead_code)]
pub fn component_error(message: &str) -> Error {
    Error::Component(message.to_string())
}

/// Helper to create calendar provider errors
pub fn calendar_error(message: &str) -> Error {
    Error::Calendar(message.to_string())
}

/// Helper to create messaging errors
pub fn messaging_error(message: &str) -> Error {
    Error::Messaging(message.to_string())
}

/// Helper to create repository errors
pub fn repository_error(message: &str) -> Error {
    Error::Repository(message.to_string())
}

/// Helper to create cache errors
pub fn cache_error(message: &str) -> Error {
    Error::Cache(message.to_string())
}

/// Helper to create other errors
#[allow(dead_code)]
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
