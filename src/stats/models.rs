use serde::{Deserialize, Serialize};

use crate::store::PuzzleId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub username: String,
    pub par: i64,
    pub average_score: f64,
    pub wins: i64,
    pub losses: i64,
    pub games_played: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: usize,
    pub username: String,
    pub par: i64,
    pub games_played: i64,
}

/// Cumulative par after `puzzle_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub puzzle_id: PuzzleId,
    pub par: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSeries {
    pub username: String,
    pub points: Vec<SeriesPoint>,
}
