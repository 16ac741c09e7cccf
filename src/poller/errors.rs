use thiserror::Error;

use crate::store::StoreError;

/// Failures reported by a chat platform adapter
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(String),
}

/// Failures that abort a poll cycle; the next scheduled cycle retries
#[derive(Debug, Error)]
pub enum PollError {
    #[error("Failed to fetch messages: {0}")]
    Source(#[from] SourceError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}
