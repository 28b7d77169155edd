use thiserror::Error;

/// Failures surfaced by the user store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("users file i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("users file serialization: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("username already exists: {0}")]
    DuplicateUsername(String),

    #[error("blocking store task failed: {0}")]
    Background(#[from] tokio::task::JoinError),
}

/// Failures from the password hashing backends.
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("argon2: {0}")]
    Argon2(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub(crate) fn internal<E: std::fmt::Display>(e: E) -> (axum::http::StatusCode, String) {
    tracing::error!(error = %e, "internal error");
    (axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
