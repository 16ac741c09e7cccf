use async_trait::async_trait;

use super::SourceError;
use crate::store::{ChannelId, MessageId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatAuthor {
    pub id: UserId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author: ChatAuthor,
    pub content: String,
}

/// The slice of a chat platform the poller needs
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Up to `limit` messages with ids greater than `after`, or from the start
    /// of the channel when `after` is `None`
    async fn fetch_after(
        &self,
        channel_id: ChannelId,
        after: Option<MessageId>,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, SourceError>;

    /// Marks a message as recorded (a reaction on Discord)
    async fn acknowledge(&self, message: &ChatMessage) -> Result<(), SourceError>;
}
