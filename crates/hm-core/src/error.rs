use crate::types::MediaId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("event not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("storage error: {message}")]
    Storage { message: String },
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("storage error: {message}")]
    Storage { message: String },
    #[error("failed to release {} of {attempted} media objects: {}", .failed.len(), join_ids(.failed))]
    ReleaseFailed {
        attempted: usize,
        failed: Vec<MediaId>,
    },
}

fn join_ids(ids: &[MediaId]) -> String {
    ids.iter()
        .map(MediaId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum HazardError {
    #[error(transparent)]
    Event(#[from] EventError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl HazardError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::Event(EventError::InvalidInput {
            message: message.into(),
        })
    }
}
