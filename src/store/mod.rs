mod errors;
pub mod models;
pub mod repository;
pub mod sqlite;

pub use errors::StoreError;
pub use models::*;
pub use repository::{GameRepository, InMemoryGameRepository};
pub use sqlite::SqliteGameRepository;
