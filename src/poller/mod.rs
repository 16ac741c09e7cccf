pub mod discord;
mod errors;
pub mod service;
pub mod source;
pub mod task;

pub use discord::DiscordMessageSource;
pub use errors::{PollError, SourceError};
pub use service::{PollPhase, PollSummary, Poller};
pub use source::{ChatAuthor, ChatMessage, MessageSource};
pub use task::{start_polling_task, PollerConfig};
