pub mod service;

mod errors;
pub mod models;

pub use errors::StatsError;
pub use models::*;
pub use service::StatsService;

/// Strokes relative to par over `game_count` games; negative is better
pub fn par(score_sum: i64, game_count: i64, baseline: i64) -> i64 {
    score_sum - baseline * game_count
}

pub fn losses(win_count: i64, game_count: i64) -> i64 {
    game_count - win_count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_par_and_losses_for_mixed_games() {
        // scores 3 (won), 7 (lost), 2 (won)
        assert_eq!(par(3 + 7 + 2, 3, 4), 0);
        assert_eq!(losses(2, 3), 1);
    }

    #[test]
    fn test_par_sign() {
        assert_eq!(par(2, 1, 4), -2);
        assert_eq!(par(6, 1, 4), 2);
        assert_eq!(par(0, 0, 4), 0);
    }
}
