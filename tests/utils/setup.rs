use std::sync::Arc;

use wordle_stats::{
    poller::ChatMessage, GameRepository, InMemoryGameRepository, Poller, ResultParser,
    ScoringConfig, SqliteGameRepository, StatsService,
};

use super::mocks::MockMessageSource;

pub const CHANNEL_ID: i64 = 9000;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub repository: Arc<dyn GameRepository>,
    pub source: Arc<MockMessageSource>,
    pub poller: Arc<Poller>,
    pub stats_service: StatsService,
}

pub struct TestSetupBuilder {
    messages: Vec<ChatMessage>,
    repository: Option<Arc<dyn GameRepository>>,
    use_sqlite: bool,
    page_size: usize,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            repository: None,
            use_sqlite: false,
            page_size: 100,
        }
    }

    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_repository(mut self, repository: Arc<dyn GameRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_sqlite(mut self) -> Self {
        self.use_sqlite = true;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub async fn build(self) -> TestSetup {
        let repository: Arc<dyn GameRepository> = match (self.repository, self.use_sqlite) {
            (Some(repository), _) => repository,
            (None, true) => Arc::new(SqliteGameRepository::in_memory().await.unwrap()),
            (None, false) => Arc::new(InMemoryGameRepository::new()),
        };

        let source = Arc::new(MockMessageSource::new());
        for message in self.messages {
            source.push(message).await;
        }

        let poller = Arc::new(
            Poller::new(
                source.clone(),
                repository.clone(),
                ResultParser::default(),
                CHANNEL_ID,
            )
            .with_page_size(self.page_size),
        );

        let stats_service = StatsService::new(repository.clone(), ScoringConfig::default());

        TestSetup {
            repository,
            source,
            poller,
            stats_service,
        }
    }
}
