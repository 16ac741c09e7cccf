use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use wordle_stats::poller::{ChatAuthor, ChatMessage, MessageSource, SourceError};
use wordle_stats::store::{
    ChannelId, GameModel, GameRepository, HistoryEntry, InMemoryGameRepository, MessageId,
    NetScore, PuzzleId, StoreError, UserAggregate, UserId, UserModel,
};

// ============================================================================
// Mock Infrastructure
// ============================================================================

pub fn message(id: MessageId, author: &str, author_id: UserId, content: &str) -> ChatMessage {
    ChatMessage {
        id,
        channel_id: super::CHANNEL_ID,
        author: ChatAuthor {
            id: author_id,
            name: author.to_string(),
        },
        content: content.to_string(),
    }
}

/// Channel backed by a message list that tests can append to between cycles
#[derive(Clone, Default)]
pub struct MockMessageSource {
    messages: Arc<RwLock<Vec<ChatMessage>>>,
    acknowledged: Arc<RwLock<Vec<MessageId>>>,
    failing_fetches: Arc<AtomicUsize>,
}

impl MockMessageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, message: ChatMessage) {
        self.messages.write().await.push(message);
    }

    pub async fn acknowledged(&self) -> Vec<MessageId> {
        self.acknowledged.read().await.clone()
    }

    /// Makes the next `count` fetches fail with a transport error
    pub fn fail_next_fetches(&self, count: usize) {
        self.failing_fetches.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageSource for MockMessageSource {
    async fn fetch_after(
        &self,
        channel_id: ChannelId,
        after: Option<MessageId>,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, SourceError> {
        let failing = self.failing_fetches.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_fetches.store(failing - 1, Ordering::SeqCst);
            return Err(SourceError::Transport("timed out".to_string()));
        }

        // Hand control back mid-request, like a real network round trip
        tokio::task::yield_now().await;

        let mut page: Vec<ChatMessage> = self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .filter(|m| after.map_or(true, |after| m.id > after))
            .cloned()
            .collect();
        page.sort_by_key(|m| m.id);
        page.truncate(limit);
        Ok(page)
    }

    async fn acknowledge(&self, message: &ChatMessage) -> Result<(), SourceError> {
        self.acknowledged.write().await.push(message.id);
        Ok(())
    }
}

/// In-memory repository whose `record_game` fails for one puzzle
pub struct FailingRepository {
    inner: InMemoryGameRepository,
    failing_puzzle: PuzzleId,
}

impl FailingRepository {
    pub fn new(failing_puzzle: PuzzleId) -> Self {
        Self {
            inner: InMemoryGameRepository::new(),
            failing_puzzle,
        }
    }
}

#[async_trait]
impl GameRepository for FailingRepository {
    async fn add_user_if_absent(&self, username: &str, user_id: UserId) -> Result<(), StoreError> {
        self.inner.add_user_if_absent(username, user_id).await
    }

    async fn record_game(&self, game: &GameModel) -> Result<bool, StoreError> {
        if game.puzzle_id == self.failing_puzzle {
            return Err(StoreError::Database("constraint failed".to_string()));
        }
        self.inner.record_game(game).await
    }

    async fn last_cursor(&self, channel_id: ChannelId) -> Result<Option<MessageId>, StoreError> {
        self.inner.last_cursor(channel_id).await
    }

    async fn update_cursor(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<(), StoreError> {
        self.inner.update_cursor(channel_id, message_id).await
    }

    async fn user_aggregate(&self, username: &str) -> Result<Option<UserAggregate>, StoreError> {
        self.inner.user_aggregate(username).await
    }

    async fn user_history(
        &self,
        username: &str,
        limit: Option<usize>,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        self.inner.user_history(username, limit).await
    }

    async fn all_user_net_scores(&self, par: i64) -> Result<Vec<NetScore>, StoreError> {
        self.inner.all_user_net_scores(par).await
    }

    async fn user_scores_as_of(
        &self,
        puzzle_id: PuzzleId,
        par: i64,
    ) -> Result<Vec<NetScore>, StoreError> {
        self.inner.user_scores_as_of(puzzle_id, par).await
    }

    async fn user_history_since(
        &self,
        username: &str,
        puzzle_id: PuzzleId,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        self.inner.user_history_since(username, puzzle_id).await
    }

    async fn all_users(&self) -> Result<Vec<UserModel>, StoreError> {
        self.inner.all_users().await
    }

    async fn latest_puzzle(&self) -> Result<Option<PuzzleId>, StoreError> {
        self.inner.latest_puzzle().await
    }
}
