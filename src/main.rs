/// Points Ledger - points balance service
///
/// Serves sign-up, sign-in, activity grants, transfers and spending
/// as XRPC procedures backed by SQLite.
use points_ledger::{
    config::{LoggingConfig, ServerConfig},
    context::AppContext,
    error::LedgerResult,
    server,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> LedgerResult<()> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize logging
    init_tracing(&config.logging);

    tracing::info!("Points Ledger v{}", env!("CARGO_PKG_VERSION"));

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(logging.json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!logging.json).then(tracing_subscriber::fmt::layer))
        .init();
}
