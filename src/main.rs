use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

mod chart;
mod config;
mod db;
mod error;
mod format;
mod llm;
mod pipeline;
mod slack;
mod sql;
mod util;

use crate::config::{AppConfig, CliArgs};
use crate::db::executor::PgQueryRunner;
use crate::llm::providers::remote::RemoteLlmProvider;
use crate::slack::client::SlackClient;
use crate::slack::state::AppState;
use crate::util::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_tracing();

    // Parse command line arguments
    let args = CliArgs::parse();

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Missing credentials fail here, before any request is accepted
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    info!(
        "Initializing Postgres connection pool (max {} connections)",
        config.database.pool_size
    );
    let pool = db::pool::build_pool(&config.database)?;
    let runner = PgQueryRunner::new(
        pool,
        Duration::from_secs(config.database.query_timeout_secs),
    );

    info!("Initializing LLM provider for model: {}", config.llm.model);
    let generator = RemoteLlmProvider::new(&config.llm)?;

    let slack_client = SlackClient::new(config.slack.bot_token.clone())?;

    let app_state = Arc::new(AppState {
        config: config.clone(),
        generator: Box::new(generator),
        runner: Box::new(runner),
        slack: slack_client,
    });

    let app = slack::routes()
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let addr = format!("{}:{}", config.web.host, config.web.port);
    info!("Starting ask-data server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
