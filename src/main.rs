mod session;

use database::Database;
use reddit_client::RedditClient;
use session::Synthesizer;
use std::io;
use std::sync::Arc;
use synth_core::{AppConfig, CoreError, ErrorExt, ErrorReporter};
use terminal::App;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CoreError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    tracing::info!("Starting r/wsb synthesizer");

    let reporter = ErrorReporter::new();
    run().await.map_err(|e| {
        reporter.report_error(&e);
        eprintln!("{}", e.user_friendly_message());
        e
    })
}

async fn run() -> Result<(), CoreError> {
    let config = AppConfig::load()?;

    let mut reddit = RedditClient::from_app_config(&config.reddit)?;
    reddit.authenticate().await?;

    let mut database = Database::new(config.database_url.clone());
    database.connect().await?;
    database.run_migrations().await?;
    // Posts are cached per session; quotes persist across runs.
    if let Err(e) = database.reset_post_cache().await {
        e.log_error();
    }
    let database = Arc::new(database);

    let backend = Synthesizer::new(reddit, database.clone(), config.market_data.api_key)?;
    let stdin = io::stdin();
    let mut app = App::new(backend, stdin.lock(), io::stdout());
    app.run().await?;

    database.close().await;
    tracing::info!("Goodbye");
    Ok(())
}
