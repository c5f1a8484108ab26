use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Error from backend: {0}")]
    BackendError(String),

    #[error("Generation request rejected: {0}")]
    Rejected(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Model(#[from] vx_core::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
