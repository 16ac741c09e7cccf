use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::{
    ChannelId, GameModel, HistoryEntry, MessageId, NetScore, PuzzleId, StoreError, UserAggregate,
    UserId, UserModel,
};

/// Storage for users, games and per-channel message cursors.
///
/// Every write is visible to readers as soon as the call returns. Queries
/// keyed by username cover every user id that currently carries that name.
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Registers a user, refreshing the display name if the id is already known
    async fn add_user_if_absent(&self, username: &str, user_id: UserId) -> Result<(), StoreError>;

    /// Inserts a game unless `(puzzle_id, user_id)` already exists.
    /// Returns whether a row was inserted.
    async fn record_game(&self, game: &GameModel) -> Result<bool, StoreError>;

    async fn last_cursor(&self, channel_id: ChannelId) -> Result<Option<MessageId>, StoreError>;

    /// Moves the channel cursor forward. Fails with `CursorRegression` if
    /// `message_id` is older than the stored cursor.
    async fn update_cursor(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<(), StoreError>;

    /// `None` when the user has no recorded games
    async fn user_aggregate(&self, username: &str) -> Result<Option<UserAggregate>, StoreError>;

    /// Newest puzzle first, truncated to `limit` entries when given
    async fn user_history(
        &self,
        username: &str,
        limit: Option<usize>,
    ) -> Result<Vec<HistoryEntry>, StoreError>;

    /// Net score of every user with at least one game, ordered by username
    async fn all_user_net_scores(&self, par: i64) -> Result<Vec<NetScore>, StoreError>;

    /// Net score per user counting only games strictly before `puzzle_id`
    async fn user_scores_as_of(
        &self,
        puzzle_id: PuzzleId,
        par: i64,
    ) -> Result<Vec<NetScore>, StoreError>;

    /// Games from `puzzle_id` onwards, oldest puzzle first
    async fn user_history_since(
        &self,
        username: &str,
        puzzle_id: PuzzleId,
    ) -> Result<Vec<HistoryEntry>, StoreError>;

    async fn all_users(&self) -> Result<Vec<UserModel>, StoreError>;

    async fn latest_puzzle(&self) -> Result<Option<PuzzleId>, StoreError>;
}

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, String>,
    games: BTreeMap<(PuzzleId, UserId), GameModel>,
    cursors: HashMap<ChannelId, MessageId>,
}

impl Tables {
    fn user_ids_named(&self, username: &str) -> HashSet<UserId> {
        self.users
            .iter()
            .filter(|(_, name)| name.as_str() == username)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Games for `username` in ascending puzzle order
    fn games_for(&self, username: &str) -> Vec<GameModel> {
        let ids = self.user_ids_named(username);
        self.games
            .values()
            .filter(|game| ids.contains(&game.user_id))
            .copied()
            .collect()
    }

    fn net_scores<F>(&self, par: i64, include: F) -> Vec<NetScore>
    where
        F: Fn(&GameModel) -> bool,
    {
        let mut totals: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
        for game in self.games.values().filter(|game| include(game)) {
            // Games always belong to a registered user, but an orphan is skipped like an inner join would
            let Some(username) = self.users.get(&game.user_id) else {
                continue;
            };
            let entry = totals.entry(username.as_str()).or_default();
            entry.0 += game.score;
            entry.1 += 1;
        }

        totals
            .into_iter()
            .map(|(username, (sum, count))| NetScore {
                username: username.to_string(),
                net_score: sum - par * count,
                game_count: count,
            })
            .collect()
    }
}

fn to_history(game: &GameModel) -> HistoryEntry {
    HistoryEntry {
        puzzle_id: game.puzzle_id,
        score: game.score,
        won: game.won,
    }
}

/// In-memory implementation of GameRepository for development and testing
#[derive(Debug, Default)]
pub struct InMemoryGameRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryGameRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn game_count(&self) -> usize {
        self.tables.read().await.games.len()
    }

    pub async fn get_game(&self, puzzle_id: PuzzleId, user_id: UserId) -> Option<GameModel> {
        self.tables
            .read()
            .await
            .games
            .get(&(puzzle_id, user_id))
            .copied()
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    #[instrument(skip(self))]
    async fn add_user_if_absent(&self, username: &str, user_id: UserId) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.users.insert(user_id, username.to_string());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn record_game(&self, game: &GameModel) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let key = (game.puzzle_id, game.user_id);
        if tables.games.contains_key(&key) {
            debug!(puzzle_id = game.puzzle_id, user_id = game.user_id, "Game already recorded");
            return Ok(false);
        }
        tables.games.insert(key, *game);
        Ok(true)
    }

    async fn last_cursor(&self, channel_id: ChannelId) -> Result<Option<MessageId>, StoreError> {
        Ok(self.tables.read().await.cursors.get(&channel_id).copied())
    }

    #[instrument(skip(self))]
    async fn update_cursor(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        match tables.cursors.get(&channel_id).copied() {
            Some(stored) if message_id < stored => {
                warn!(channel_id, stored, attempted = message_id, "Rejected cursor regression");
                Err(StoreError::CursorRegression {
                    channel_id,
                    stored,
                    attempted: message_id,
                })
            }
            _ => {
                tables.cursors.insert(channel_id, message_id);
                Ok(())
            }
        }
    }

    async fn user_aggregate(&self, username: &str) -> Result<Option<UserAggregate>, StoreError> {
        let games = self.tables.read().await.games_for(username);
        if games.is_empty() {
            return Ok(None);
        }

        let game_count = games.len() as i64;
        let score_sum: i64 = games.iter().map(|game| game.score).sum();
        let win_count = games.iter().filter(|game| game.won).count() as i64;

        Ok(Some(UserAggregate {
            score_sum,
            score_avg: score_sum as f64 / game_count as f64,
            win_count,
            game_count,
        }))
    }

    async fn user_history(
        &self,
        username: &str,
        limit: Option<usize>,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        let games = self.tables.read().await.games_for(username);
        let newest_first = games.iter().rev().map(to_history);
        Ok(match limit {
            Some(limit) => newest_first.take(limit).collect(),
            None => newest_first.collect(),
        })
    }

    async fn all_user_net_scores(&self, par: i64) -> Result<Vec<NetScore>, StoreError> {
        Ok(self.tables.read().await.net_scores(par, |_| true))
    }

    async fn user_scores_as_of(
        &self,
        puzzle_id: PuzzleId,
        par: i64,
    ) -> Result<Vec<NetScore>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .net_scores(par, |game| game.puzzle_id < puzzle_id))
    }

    async fn user_history_since(
        &self,
        username: &str,
        puzzle_id: PuzzleId,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        let games = self.tables.read().await.games_for(username);
        Ok(games
            .iter()
            .filter(|game| game.puzzle_id >= puzzle_id)
            .map(to_history)
            .collect())
    }

    async fn all_users(&self) -> Result<Vec<UserModel>, StoreError> {
        let tables = self.tables.read().await;
        let mut users: Vec<UserModel> = tables
            .users
            .iter()
            .map(|(user_id, username)| UserModel {
                username: username.clone(),
                user_id: *user_id,
            })
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username).then(a.user_id.cmp(&b.user_id)));
        Ok(users)
    }

    async fn latest_puzzle(&self) -> Result<Option<PuzzleId>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .games
            .keys()
            .map(|(puzzle_id, _)| *puzzle_id)
            .max())
    }
}
