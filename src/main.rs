use std::sync::Arc;

use anyhow::Result;
use browsing_copilot::brain::OpenAiFactory;
use browsing_copilot::{AppState, ServerConfig, face};
use clap::Parser;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let config = ServerConfig::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "browsing_copilot={0},tower_http={0}",
                config.log_level.to_lowercase()
            ))
        }))
        .with(fmt::layer())
        .init();

    info!(
        backend = ?config.backend,
        chat_model = %config.chat_model,
        "Starting browsing copilot v{}",
        env!("CARGO_PKG_VERSION")
    );

    let state = Arc::new(AppState::new(config, Arc::new(OpenAiFactory::default())));
    face::serve(state).await
}
