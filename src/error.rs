// src/error.rs
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SceneError>;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Invalid scene config: {0}")]
    InvalidConfig(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
