use serde::{Deserialize, Serialize};

use crate::store::HistoryEntry;

pub const DEFAULT_SERIES_GAMES: usize = 7;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// 0 or absent returns every game
    #[serde(default)]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct SeriesQuery {
    #[serde(default = "default_series_games")]
    pub games: usize,
}

fn default_series_games() -> usize {
    DEFAULT_SERIES_GAMES
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserHistoryResponse {
    pub username: String,
    pub games: Vec<HistoryEntry>,
}
