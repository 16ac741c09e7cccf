// Public API - what other modules can use
pub use handlers::{
    get_leaderboard, get_par_series, get_user_history, get_user_stats, health, router,
};

// Internal modules
mod handlers;
pub mod types;
