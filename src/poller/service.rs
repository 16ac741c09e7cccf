use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

use super::{ChatMessage, MessageSource, PollError};
use crate::parser::ResultParser;
use crate::store::{ChannelId, GameModel, GameRepository, MessageId, StoreError};

pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PollPhase {
    Idle,
    Fetching,
    Processing,
}

/// Outcome of one poll cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollSummary {
    pub fetched: usize,
    /// Messages that parsed as a result (including already-recorded ones)
    pub recorded: usize,
    /// Messages that were not results
    pub skipped: usize,
    /// Messages whose processing failed; the cursor moved past them anyway
    pub failed: usize,
    pub cursor: Option<MessageId>,
}

/// Pulls new messages from one channel into the repository.
///
/// The only writer of games, users and the channel cursor. Cycles never
/// overlap: a second `poll_once` waits for the running one.
pub struct Poller {
    source: Arc<dyn MessageSource>,
    repository: Arc<dyn GameRepository>,
    parser: ResultParser,
    channel_id: ChannelId,
    page_size: usize,
    phase: RwLock<PollPhase>,
    cycle_lock: AsyncMutex<()>,
}

impl Poller {
    pub fn new(
        source: Arc<dyn MessageSource>,
        repository: Arc<dyn GameRepository>,
        parser: ResultParser,
        channel_id: ChannelId,
    ) -> Self {
        Self {
            source,
            repository,
            parser,
            channel_id,
            page_size: DEFAULT_PAGE_SIZE,
            phase: RwLock::new(PollPhase::Idle),
            cycle_lock: AsyncMutex::new(()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    pub async fn phase(&self) -> PollPhase {
        *self.phase.read().await
    }

    /// Runs one cycle: fetch every page after the stored cursor and process
    /// each message in id order.
    ///
    /// Per-message failures are logged and counted, and the cursor still moves
    /// past the message. Fetch and cursor-write failures end the cycle early;
    /// everything processed before that point stays committed.
    #[instrument(skip(self), fields(channel_id = self.channel_id))]
    pub async fn poll_once(&self) -> Result<PollSummary, PollError> {
        let _guard = self.cycle_lock.lock().await;
        let result = self.run_cycle().await;
        self.set_phase(PollPhase::Idle).await;
        result
    }

    async fn run_cycle(&self) -> Result<PollSummary, PollError> {
        let mut cursor = self.repository.last_cursor(self.channel_id).await?;
        let mut summary = PollSummary {
            cursor,
            ..PollSummary::default()
        };

        loop {
            self.set_phase(PollPhase::Fetching).await;
            let mut page = self
                .source
                .fetch_after(self.channel_id, cursor, self.page_size)
                .await?;

            if page.is_empty() {
                break;
            }

            page.sort_by_key(|message| message.id);
            summary.fetched += page.len();
            self.set_phase(PollPhase::Processing).await;

            let page_start = cursor;
            for message in &page {
                if cursor.is_some_and(|processed| message.id <= processed) {
                    debug!(message_id = message.id, "Skipping already processed message");
                    continue;
                }

                match self.process_message(message).await {
                    Ok(true) => summary.recorded += 1,
                    Ok(false) => summary.skipped += 1,
                    Err(e) => {
                        error!(
                            message_id = message.id,
                            author = %message.author.name,
                            error = %e,
                            "Failed to process message"
                        );
                        summary.failed += 1;
                    }
                }

                self.repository
                    .update_cursor(self.channel_id, message.id)
                    .await?;
                cursor = Some(message.id);
            }

            // A source that keeps returning old messages would otherwise loop forever
            if cursor == page_start {
                warn!("Page contained no new messages, ending cycle");
                break;
            }
        }

        summary.cursor = cursor;
        if summary.fetched == 0 {
            debug!(cursor = ?cursor, "Caught up, no new messages");
        } else {
            info!(
                fetched = summary.fetched,
                recorded = summary.recorded,
                skipped = summary.skipped,
                failed = summary.failed,
                cursor = ?cursor,
                "Poll cycle completed"
            );
        }
        Ok(summary)
    }

    /// Returns whether the message was a game result
    async fn process_message(&self, message: &ChatMessage) -> Result<bool, StoreError> {
        let Some(result) = self.parser.parse(&message.content) else {
            return Ok(false);
        };

        self.repository
            .add_user_if_absent(&message.author.name, message.author.id)
            .await?;

        let game = GameModel::from_parsed(message.author.id, result);
        if self.repository.record_game(&game).await? {
            info!(
                puzzle_id = game.puzzle_id,
                author = %message.author.name,
                score = game.score,
                won = game.won,
                "Recorded game"
            );
        }

        if let Err(e) = self.source.acknowledge(message).await {
            warn!(message_id = message.id, error = %e, "Failed to acknowledge message");
        }

        Ok(true)
    }

    async fn set_phase(&self, phase: PollPhase) {
        *self.phase.write().await = phase;
    }
}
