// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while seeding. Only `InvalidPath` and `Connection` abort a
/// run; the remaining variants are recorded per document or per batch and
/// surfaced in the final [`ImportResult`](crate::coordinator::ImportResult).
#[derive(Debug, Clone, Error)]
pub enum SeederError {
    #[error("invalid input path: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("failed to parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("transformer '{name}' failed: {reason}")]
    Transform { name: String, reason: String },

    #[error("database connection failed: {0}")]
    Connection(String),

    #[error("write to '{collection}' failed: {reason}")]
    Write { collection: String, reason: String },
}

impl SeederError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidPath(_) | Self::Connection(_))
    }
}
