use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wordle_stats::{
    api,
    poller::{start_polling_task, DiscordMessageSource, PollerConfig},
    AppState, Config, Environment, GameRepository, Poller, ResultParser, SqliteGameRepository,
    StatsService,
};

#[derive(Parser, Debug)]
#[command(about = "Run the Wordle Stats bot")]
struct Cli {
    /// Use the Prod section of the config file
    #[arg(long)]
    prod: bool,

    /// Path to the JSON config file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wordle_stats=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let environment = Environment::from_prod_flag(cli.prod);
    info!(%environment, "Starting Wordle Stat Bot");

    let config = Config::load(&cli.config, environment)?;
    info!(%config, "Loaded configuration");

    let sqlite = SqliteGameRepository::connect(&config.database_name).await?;
    sqlite.initialize().await?;
    let repository: Arc<dyn GameRepository> = Arc::new(sqlite);

    let scoring = config.scoring();
    let stats_service = Arc::new(StatsService::new(repository.clone(), scoring));

    let source = Arc::new(DiscordMessageSource::new(config.discord_token.clone()));
    let poller = Arc::new(
        Poller::new(
            source,
            repository,
            ResultParser::new(&scoring),
            config.channel_id,
        )
        .with_page_size(config.page_size),
    );

    tokio::spawn(start_polling_task(
        poller,
        PollerConfig {
            poll_interval: config.poll_interval(),
        },
    ));

    let app = api::router(AppState::new(stats_service));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Query API listening");
    axum::serve(listener, app).await?;

    Ok(())
}
