use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{ChatAuthor, ChatMessage, MessageSource, SourceError};
use crate::store::{ChannelId, MessageId};

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";
/// Discord rejects larger pages
const MAX_PAGE_SIZE: usize = 100;
/// Green square, percent-encoded for the reactions endpoint
const ACK_EMOJI: &str = "%F0%9F%9F%A9";

#[derive(Debug, Deserialize)]
struct DiscordUser {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct DiscordMessage {
    id: String,
    channel_id: String,
    #[serde(default)]
    content: String,
    author: DiscordUser,
}

fn parse_snowflake(field: &str, raw: &str) -> Result<i64, SourceError> {
    raw.parse()
        .map_err(|_| SourceError::Decode(format!("invalid {} '{}'", field, raw)))
}

impl TryFrom<DiscordMessage> for ChatMessage {
    type Error = SourceError;

    fn try_from(message: DiscordMessage) -> Result<Self, Self::Error> {
        Ok(ChatMessage {
            id: parse_snowflake("message id", &message.id)?,
            channel_id: parse_snowflake("channel id", &message.channel_id)?,
            author: ChatAuthor {
                id: parse_snowflake("author id", &message.author.id)?,
                name: message.author.username,
            },
            content: message.content,
        })
    }
}

/// Reads a channel through the Discord REST API with a bot token
pub struct DiscordMessageSource {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl DiscordMessageSource {
    pub fn new(token: String) -> Self {
        Self::with_base_url(token, DISCORD_API_BASE.to_string())
    }

    pub fn with_base_url(token: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            base_url,
        }
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.token)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SourceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), body = %body, "Discord request failed");
        Err(SourceError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl MessageSource for DiscordMessageSource {
    #[instrument(skip(self))]
    async fn fetch_after(
        &self,
        channel_id: ChannelId,
        after: Option<MessageId>,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, SourceError> {
        // after=0 walks the channel from its first message
        let after = after.unwrap_or(0).to_string();
        let limit = limit.clamp(1, MAX_PAGE_SIZE).to_string();

        let response = self
            .client
            .get(format!("{}/channels/{}/messages", self.base_url, channel_id))
            .query(&[("after", after.as_str()), ("limit", limit.as_str())])
            .header(AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let messages: Vec<DiscordMessage> = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        debug!(count = messages.len(), "Fetched messages");
        messages.into_iter().map(ChatMessage::try_from).collect()
    }

    #[instrument(skip(self, message), fields(message_id = message.id))]
    async fn acknowledge(&self, message: &ChatMessage) -> Result<(), SourceError> {
        let url = format!(
            "{}/channels/{}/messages/{}/reactions/{}/@me",
            self.base_url, message.channel_id, message.id, ACK_EMOJI
        );

        let response = self
            .client
            .put(url)
            .header(AUTHORIZATION, self.auth_header())
            .header(CONTENT_LENGTH, 0)
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        Self::check_status(response).await?;
        Ok(())
    }
}
