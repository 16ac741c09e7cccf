use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, instrument};

use super::{LeaderboardEntry, SeriesPoint, StatsError, UserSeries, UserStats};
use crate::config::ScoringConfig;
use crate::store::{GameRepository, HistoryEntry, PuzzleId};

/// Read-only queries composed from repository aggregates.
///
/// Safe to call while a poll cycle is writing; each underlying statement
/// sees a consistent table, but two calls may straddle a write.
pub struct StatsService {
    repository: Arc<dyn GameRepository>,
    scoring: ScoringConfig,
}

impl StatsService {
    pub fn new(repository: Arc<dyn GameRepository>, scoring: ScoringConfig) -> Self {
        Self {
            repository,
            scoring,
        }
    }

    /// `None` when the user has no recorded games
    #[instrument(skip(self))]
    pub async fn user_stats(&self, username: &str) -> Result<Option<UserStats>, StatsError> {
        let Some(aggregate) = self.repository.user_aggregate(username).await? else {
            debug!(username, "No games recorded for user");
            return Ok(None);
        };

        Ok(Some(UserStats {
            username: username.to_string(),
            par: super::par(aggregate.score_sum, aggregate.game_count, self.scoring.par),
            average_score: aggregate.score_avg,
            wins: aggregate.win_count,
            losses: super::losses(aggregate.win_count, aggregate.game_count),
            games_played: aggregate.game_count,
        }))
    }

    /// Newest puzzle first. A `limit` of 0 returns the full history.
    #[instrument(skip(self))]
    pub async fn user_history(
        &self,
        username: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, StatsError> {
        let limit = (limit > 0).then_some(limit);
        Ok(self.repository.user_history(username, limit).await?)
    }

    /// Users ordered by par, best first; ties keep the repository's order
    #[instrument(skip(self))]
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, StatsError> {
        let mut scores = self.repository.all_user_net_scores(self.scoring.par).await?;
        scores.sort_by_key(|score| score.net_score);

        Ok(scores
            .into_iter()
            .enumerate()
            .map(|(index, score)| LeaderboardEntry {
                rank: index + 1,
                username: score.username,
                par: score.net_score,
                games_played: score.game_count,
            })
            .collect())
    }

    /// Cumulative par curves over the most recent `window` puzzles.
    ///
    /// Each curve starts from the user's par over all games before the window
    /// and adds `score - par` per game. Users without games in the window are
    /// left out.
    #[instrument(skip(self))]
    pub async fn par_series(&self, window: usize) -> Result<Vec<UserSeries>, StatsError> {
        if window == 0 {
            return Err(StatsError::Validation(
                "window must cover at least one puzzle".to_string(),
            ));
        }

        let Some(latest) = self.repository.latest_puzzle().await? else {
            return Ok(Vec::new());
        };
        let window = PuzzleId::try_from(window).unwrap_or(PuzzleId::MAX);
        let start = latest.saturating_sub(window - 1);

        let baselines: HashMap<String, i64> = self
            .repository
            .user_scores_as_of(start, self.scoring.par)
            .await?
            .into_iter()
            .map(|score| (score.username, score.net_score))
            .collect();

        // Several ids may share a display name; their games are reported together
        let usernames: BTreeSet<String> = self
            .repository
            .all_users()
            .await?
            .into_iter()
            .map(|user| user.username)
            .collect();

        let mut series = Vec::new();
        for username in usernames {
            let games = self.repository.user_history_since(&username, start).await?;
            if games.is_empty() {
                continue;
            }

            let mut running = baselines.get(&username).copied().unwrap_or_default();
            let points = games
                .iter()
                .map(|game| {
                    running += game.score - self.scoring.par;
                    SeriesPoint {
                        puzzle_id: game.puzzle_id,
                        par: running,
                    }
                })
                .collect();

            series.push(UserSeries { username, points });
        }

        debug!(start, latest, users = series.len(), "Built par series");
        Ok(series)
    }
}
