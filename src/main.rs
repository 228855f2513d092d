use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,audit=info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = helpdesk_api::config::config();
    tracing::info!("Starting Helpdesk API in {:?} mode", config.environment);

    helpdesk_api::serve(config).await
}
