use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use super::types::{HistoryQuery, SeriesQuery, UserHistoryResponse};
use crate::shared::{AppError, AppState};
use crate::stats::{LeaderboardEntry, UserSeries, UserStats};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users/:username/stats", get(get_user_stats))
        .route("/users/:username/history", get(get_user_history))
        .route("/leaderboard", get(get_leaderboard))
        .route("/series", get(get_par_series))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn health() -> &'static str {
    "ok"
}

fn no_games(username: &str) -> AppError {
    AppError::NotFound(format!("{} has not played any loaded games", username))
}

/// GET /users/:username/stats
#[instrument(name = "get_user_stats", skip(state))]
pub async fn get_user_stats(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserStats>, AppError> {
    let stats = state
        .stats_service
        .user_stats(&username)
        .await?
        .ok_or_else(|| no_games(&username))?;

    Ok(Json(stats))
}

/// GET /users/:username/history?limit=N
#[instrument(name = "get_user_history", skip(state))]
pub async fn get_user_history(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<UserHistoryResponse>, AppError> {
    let games = state
        .stats_service
        .user_history(&username, query.limit)
        .await?;

    if games.is_empty() {
        return Err(no_games(&username));
    }

    Ok(Json(UserHistoryResponse { username, games }))
}

/// GET /leaderboard
#[instrument(name = "get_leaderboard", skip(state))]
pub async fn get_leaderboard(
    State(state): State<AppState>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let leaderboard = state.stats_service.leaderboard().await?;
    info!(users = leaderboard.len(), "Leaderboard generated");
    Ok(Json(leaderboard))
}

/// GET /series?games=N
#[instrument(name = "get_par_series", skip(state))]
pub async fn get_par_series(
    State(state): State<AppState>,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<Vec<UserSeries>>, AppError> {
    let series = state.stats_service.par_series(query.games).await?;
    Ok(Json(series))
}
