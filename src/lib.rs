// Library crate for the Wordle stats bot
// This file exposes the public API for the binary and integration tests

pub mod api;
pub mod config;
pub mod parser;
pub mod poller;
pub mod shared;
pub mod stats;
pub mod store;

// Re-export commonly used types for easier access in tests
pub use config::{Config, Environment, ScoringConfig};
pub use parser::{ParsedResult, ResultParser};
pub use poller::{MessageSource, PollSummary, Poller};
pub use shared::{AppError, AppState};
pub use stats::StatsService;
pub use store::{GameRepository, InMemoryGameRepository, SqliteGameRepository};
