use thiserror::Error;

use super::{ChannelId, MessageId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Cursor for channel {channel_id} would move back from {stored} to {attempted}")]
    CursorRegression {
        channel_id: ChannelId,
        stored: MessageId,
        attempted: MessageId,
    },
}
