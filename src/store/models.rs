use serde::{Deserialize, Serialize};

use crate::parser::ParsedResult;
pub use crate::parser::PuzzleId;

/// Stable platform id of a message author
pub type UserId = i64;
/// Platform message id; ids increase within a channel
pub type MessageId = i64;
pub type ChannelId = i64;

/// Row of the users table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserModel {
    pub username: String,
    pub user_id: UserId,
}

/// Row of the games table, unique on `(puzzle_id, user_id)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameModel {
    pub puzzle_id: PuzzleId,
    pub user_id: UserId,
    pub score: i64,
    pub won: bool,
}

impl GameModel {
    pub fn from_parsed(user_id: UserId, result: ParsedResult) -> Self {
        Self {
            puzzle_id: result.puzzle_id,
            user_id,
            score: result.score,
            won: result.won,
        }
    }
}

/// Raw totals over every game a user has recorded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserAggregate {
    pub score_sum: i64,
    pub score_avg: f64,
    pub win_count: i64,
    pub game_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub puzzle_id: PuzzleId,
    pub score: i64,
    pub won: bool,
}

/// A user's score relative to par, `score_sum - par * game_count`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetScore {
    pub username: String,
    pub net_score: i64,
    pub game_count: i64,
}
