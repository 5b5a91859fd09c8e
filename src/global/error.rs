use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("module error: {0}")]
    Module(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("mongodb connection failed")]
    ConnexionFailed(#[from] mongodb::error::Error),

    #[error("query failed: {0}")]
    Query(String),
}

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("rate limited (retry after {retry_after:?}): {message}")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },

    #[error("unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("failed to deserialize response: {0}")]
    DeserializationFailed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("missing API key for '{0}'")]
    MissingApiKey(String),
}
