use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};

use super::{
    ChannelId, GameModel, GameRepository, HistoryEntry, MessageId, NetScore, PuzzleId, StoreError,
    UserAggregate, UserId, UserModel,
};

const CREATE_USERS: &str = "
    CREATE TABLE IF NOT EXISTS Users (
        username TEXT NOT NULL,
        discord_user_id INTEGER NOT NULL,
        CONSTRAINT unique_users UNIQUE (discord_user_id)
    )";

const CREATE_GAMES: &str = "
    CREATE TABLE IF NOT EXISTS Games (
        game_id INTEGER NOT NULL,
        discord_user_id INTEGER NOT NULL,
        score INTEGER NOT NULL,
        won BOOLEAN NOT NULL,
        CONSTRAINT unique_games UNIQUE (game_id, discord_user_id)
    )";

const CREATE_LAST_MESSAGE: &str = "
    CREATE TABLE IF NOT EXISTS LastMessage (
        last_parsed_message_id INTEGER NOT NULL,
        channel_id INTEGER NOT NULL,
        CONSTRAINT unique_channels UNIQUE (channel_id)
    )";

const ALL_NET_SCORES: &str = "
    SELECT u.username AS username,
           SUM(g.score) - ?1 * COUNT(*) AS net_score,
           COUNT(*) AS game_count
    FROM Games g
    INNER JOIN Users u ON u.discord_user_id = g.discord_user_id
    GROUP BY u.username
    ORDER BY u.username";

const NET_SCORES_BEFORE: &str = "
    SELECT u.username AS username,
           SUM(g.score) - ?1 * COUNT(*) AS net_score,
           COUNT(*) AS game_count
    FROM Games g
    INNER JOIN Users u ON u.discord_user_id = g.discord_user_id
    WHERE g.game_id < ?2
    GROUP BY u.username
    ORDER BY u.username";

fn db_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| {
        warn!(error = %e, operation, "Database operation failed");
        StoreError::Database(e.to_string())
    }
}

fn history_entry(row: &SqliteRow) -> Result<HistoryEntry, sqlx::Error> {
    Ok(HistoryEntry {
        puzzle_id: row.try_get("game_id")?,
        score: row.try_get("score")?,
        won: row.try_get("won")?,
    })
}

fn net_score(row: &SqliteRow) -> Result<NetScore, sqlx::Error> {
    Ok(NetScore {
        username: row.try_get("username")?,
        net_score: row.try_get("net_score")?,
        game_count: row.try_get("game_count")?,
    })
}

/// SQLite implementation of GameRepository.
///
/// The pool holds a single connection, so statements from the poller and
/// from concurrent queries are serialised. Each statement commits on its own.
pub struct SqliteGameRepository {
    pool: SqlitePool,
}

impl SqliteGameRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database file at `path`
    pub async fn connect(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(db_error("connect"))?;

        info!(database = %path, "Connected to database");
        Ok(Self::new(pool))
    }

    /// Private in-memory database, used by tests
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(db_error("connect"))?;

        // The database lives only as long as its connection
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(db_error("connect"))?;

        let repository = Self::new(pool);
        repository.initialize().await?;
        Ok(repository)
    }

    /// Creates the schema if it does not exist yet
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<(), StoreError> {
        for statement in [CREATE_USERS, CREATE_GAMES, CREATE_LAST_MESSAGE] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_error("create schema"))?;
        }
        debug!("Schema ready");
        Ok(())
    }
}

#[async_trait]
impl GameRepository for SqliteGameRepository {
    #[instrument(skip(self))]
    async fn add_user_if_absent(&self, username: &str, user_id: UserId) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO Users (username, discord_user_id) VALUES (?1, ?2)
             ON CONFLICT(discord_user_id) DO UPDATE SET username = excluded.username",
        )
        .bind(username)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(db_error("add user"))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn record_game(&self, game: &GameModel) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO Games (game_id, discord_user_id, score, won) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(game.puzzle_id)
        .bind(game.user_id)
        .bind(game.score)
        .bind(game.won)
        .execute(&self.pool)
        .await
        .map_err(db_error("record game"))?;

        let inserted = result.rows_affected() > 0;
        if !inserted {
            debug!(puzzle_id = game.puzzle_id, user_id = game.user_id, "Game already recorded");
        }
        Ok(inserted)
    }

    async fn last_cursor(&self, channel_id: ChannelId) -> Result<Option<MessageId>, StoreError> {
        let row = sqlx::query("SELECT last_parsed_message_id FROM LastMessage WHERE channel_id = ?1")
            .bind(channel_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("read cursor"))?;

        row.map(|row| row.try_get::<MessageId, _>("last_parsed_message_id"))
            .transpose()
            .map_err(db_error("read cursor"))
    }

    #[instrument(skip(self))]
    async fn update_cursor(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO LastMessage (last_parsed_message_id, channel_id) VALUES (?1, ?2)
             ON CONFLICT(channel_id) DO UPDATE
             SET last_parsed_message_id = excluded.last_parsed_message_id
             WHERE excluded.last_parsed_message_id >= LastMessage.last_parsed_message_id",
        )
        .bind(message_id)
        .bind(channel_id)
        .execute(&self.pool)
        .await
        .map_err(db_error("update cursor"))?;

        if result.rows_affected() == 0 {
            let stored = self.last_cursor(channel_id).await?.unwrap_or_default();
            warn!(channel_id, stored, attempted = message_id, "Rejected cursor regression");
            return Err(StoreError::CursorRegression {
                channel_id,
                stored,
                attempted: message_id,
            });
        }

        Ok(())
    }

    async fn user_aggregate(&self, username: &str) -> Result<Option<UserAggregate>, StoreError> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(g.score), 0) AS score_sum,
                    COALESCE(AVG(g.score), 0.0) AS score_avg,
                    COUNT(CASE WHEN g.won THEN 1 END) AS win_count,
                    COUNT(*) AS game_count
             FROM Games g
             INNER JOIN Users u ON u.discord_user_id = g.discord_user_id
             WHERE u.username = ?1",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("user aggregate"))?;

        let game_count: i64 = row.try_get("game_count").map_err(db_error("user aggregate"))?;
        if game_count == 0 {
            return Ok(None);
        }

        let decode = |row: &SqliteRow| -> Result<UserAggregate, sqlx::Error> {
            Ok(UserAggregate {
                score_sum: row.try_get("score_sum")?,
                score_avg: row.try_get("score_avg")?,
                win_count: row.try_get("win_count")?,
                game_count,
            })
        };
        decode(&row).map(Some).map_err(db_error("user aggregate"))
    }

    async fn user_history(
        &self,
        username: &str,
        limit: Option<usize>,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        // LIMIT -1 means no limit in SQLite
        let limit = limit.map_or(-1, |limit| i64::try_from(limit).unwrap_or(i64::MAX));

        let rows = sqlx::query(
            "SELECT g.game_id, g.score, g.won
             FROM Games g
             INNER JOIN Users u ON u.discord_user_id = g.discord_user_id
             WHERE u.username = ?1
             ORDER BY g.game_id DESC
             LIMIT ?2",
        )
        .bind(username)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("user history"))?;

        rows.iter()
            .map(history_entry)
            .collect::<Result<_, _>>()
            .map_err(db_error("user history"))
    }

    async fn all_user_net_scores(&self, par: i64) -> Result<Vec<NetScore>, StoreError> {
        let rows = sqlx::query(ALL_NET_SCORES)
            .bind(par)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("all net scores"))?;

        rows.iter()
            .map(net_score)
            .collect::<Result<_, _>>()
            .map_err(db_error("all net scores"))
    }

    async fn user_scores_as_of(
        &self,
        puzzle_id: PuzzleId,
        par: i64,
    ) -> Result<Vec<NetScore>, StoreError> {
        let rows = sqlx::query(NET_SCORES_BEFORE)
            .bind(par)
            .bind(puzzle_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("net scores"))?;

        rows.iter()
            .map(net_score)
            .collect::<Result<_, _>>()
            .map_err(db_error("net scores"))
    }

    async fn user_history_since(
        &self,
        username: &str,
        puzzle_id: PuzzleId,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        let rows = sqlx::query(
            "SELECT g.game_id, g.score, g.won
             FROM Games g
             INNER JOIN Users u ON u.discord_user_id = g.discord_user_id
             WHERE u.username = ?1 AND g.game_id >= ?2
             ORDER BY g.game_id ASC",
        )
        .bind(username)
        .bind(puzzle_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("user history since"))?;

        rows.iter()
            .map(history_entry)
            .collect::<Result<_, _>>()
            .map_err(db_error("user history since"))
    }

    async fn all_users(&self) -> Result<Vec<UserModel>, StoreError> {
        let rows = sqlx::query(
            "SELECT username, discord_user_id FROM Users ORDER BY username, discord_user_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list users"))?;

        rows.iter()
            .map(|row| -> Result<UserModel, sqlx::Error> {
                Ok(UserModel {
                    username: row.try_get("username")?,
                    user_id: row.try_get("discord_user_id")?,
                })
            })
            .collect::<Result<_, _>>()
            .map_err(db_error("list users"))
    }

    async fn latest_puzzle(&self) -> Result<Option<PuzzleId>, StoreError> {
        let row = sqlx::query("SELECT MAX(game_id) AS latest FROM Games")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("latest puzzle"))?;

        row.try_get::<Option<PuzzleId>, _>("latest")
            .map_err(db_error("latest puzzle"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_repo() -> SqliteGameRepository {
        let repo = SqliteGameRepository::in_memory().await.unwrap();
        repo.add_user_if_absent("alice", 1).await.unwrap();
        repo.add_user_if_absent("bob", 2).await.unwrap();

        for (puzzle_id, user_id, score, won) in [
            (10, 1, 3, true),
            (11, 1, 7, false),
            (12, 1, 2, true),
            (10, 2, 4, true),
            (12, 2, 5, true),
        ] {
            let game = GameModel {
                puzzle_id,
                user_id,
                score,
                won,
            };
            assert!(repo.record_game(&game).await.unwrap());
        }
        repo
    }

    #[tokio::test]
    async fn test_initialize_is_repeatable() {
        let repo = seeded_repo().await;
        repo.initialize().await.unwrap();

        assert_eq!(repo.latest_puzzle().await.unwrap(), Some(12));
    }

    #[tokio::test]
    async fn test_record_game_ignores_duplicates() {
        let repo = seeded_repo().await;
        let duplicate = GameModel {
            puzzle_id: 10,
            user_id: 1,
            score: 6,
            won: true,
        };

        assert!(!repo.record_game(&duplicate).await.unwrap());

        let history = repo.user_history("alice", None).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].score, 3);
    }

    #[tokio::test]
    async fn test_user_rename_updates_queries() {
        let repo = seeded_repo().await;
        repo.add_user_if_absent("alicia", 1).await.unwrap();

        assert!(repo.user_aggregate("alice").await.unwrap().is_none());
        assert_eq!(
            repo.user_aggregate("alicia").await.unwrap().unwrap().game_count,
            3
        );
        assert_eq!(repo.all_users().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cursor_lifecycle() {
        let repo = SqliteGameRepository::in_memory().await.unwrap();
        assert_eq!(repo.last_cursor(42).await.unwrap(), None);

        repo.update_cursor(42, 100).await.unwrap();
        repo.update_cursor(42, 250).await.unwrap();
        repo.update_cursor(42, 250).await.unwrap();
        assert_eq!(repo.last_cursor(42).await.unwrap(), Some(250));

        let result = repo.update_cursor(42, 120).await;
        assert!(matches!(
            result,
            Err(StoreError::CursorRegression {
                channel_id: 42,
                stored: 250,
                attempted: 120
            })
        ));
        assert_eq!(repo.last_cursor(42).await.unwrap(), Some(250));
    }

    #[tokio::test]
    async fn test_user_aggregate() {
        let repo = seeded_repo().await;

        let aggregate = repo.user_aggregate("alice").await.unwrap().unwrap();
        assert_eq!(aggregate.score_sum, 12);
        assert_eq!(aggregate.win_count, 2);
        assert_eq!(aggregate.game_count, 3);
        assert!((aggregate.score_avg - 4.0).abs() < f64::EPSILON);

        assert!(repo.user_aggregate("carol").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_user_history() {
        let repo = seeded_repo().await;

        let all = repo.user_history("alice", None).await.unwrap();
        assert_eq!(
            all,
            vec![
                HistoryEntry {
                    puzzle_id: 12,
                    score: 2,
                    won: true
                },
                HistoryEntry {
                    puzzle_id: 11,
                    score: 7,
                    won: false
                },
                HistoryEntry {
                    puzzle_id: 10,
                    score: 3,
                    won: true
                },
            ]
        );

        let limited = repo.user_history("alice", Some(1)).await.unwrap();
        assert_eq!(limited, all[..1].to_vec());
    }

    #[tokio::test]
    async fn test_net_scores_and_scores_as_of() {
        let repo = seeded_repo().await;

        let all = repo.all_user_net_scores(4).await.unwrap();
        let pairs: Vec<(String, i64, i64)> = all
            .into_iter()
            .map(|s| (s.username, s.net_score, s.game_count))
            .collect();
        assert_eq!(
            pairs,
            vec![("alice".to_string(), 0, 3), ("bob".to_string(), 1, 2)]
        );

        let before_12 = repo.user_scores_as_of(12, 4).await.unwrap();
        assert_eq!(before_12[0].net_score, 2); // alice: 3 + 7 - 8
        assert_eq!(before_12[1].net_score, 0); // bob: 4 - 4
    }

    #[tokio::test]
    async fn test_net_scores_include_highest_puzzle_number() {
        let repo = SqliteGameRepository::in_memory().await.unwrap();
        let parsed = crate::parser::ResultParser::default()
            .parse("Wordle 9223372036854775807 2/6")
            .unwrap();
        repo.add_user_if_absent("alice", 1).await.unwrap();
        assert!(repo
            .record_game(&GameModel::from_parsed(1, parsed))
            .await
            .unwrap());

        let aggregate = repo.user_aggregate("alice").await.unwrap().unwrap();
        let all = repo.all_user_net_scores(4).await.unwrap();

        assert_eq!(aggregate.game_count, 1);
        assert_eq!(
            all,
            vec![NetScore {
                username: "alice".to_string(),
                net_score: -2,
                game_count: 1
            }]
        );
        assert_eq!(repo.latest_puzzle().await.unwrap(), Some(PuzzleId::MAX));
    }

    #[tokio::test]
    async fn test_history_since_and_latest() {
        let repo = seeded_repo().await;

        let since = repo.user_history_since("bob", 11).await.unwrap();
        assert_eq!(
            since,
            vec![HistoryEntry {
                puzzle_id: 12,
                score: 5,
                won: true
            }]
        );

        let empty = SqliteGameRepository::in_memory().await.unwrap();
        assert_eq!(empty.latest_puzzle().await.unwrap(), None);
    }
}
