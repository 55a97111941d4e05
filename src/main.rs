use deal_desk::{
    bot,
    config::{self, database},
    errors::{Error, Result},
    order_api::{OrderApiClient, OrderLookup},
};
use dotenvy::dotenv;
use std::{env, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load and check the desk configuration
    let desk_config = config::desk::load_default_config()
        .and_then(|c| c.validate().map(|()| c))
        .inspect_err(|e| error!("Failed to load desk configuration: {}", e))?;
    info!(admins = desk_config.admin_ids.len(), "Desk configuration loaded.");

    // 4. Open the deal store
    if database::get_database_url().starts_with("sqlite://data/") {
        std::fs::create_dir_all("data")?;
    }
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Order system client
    let lookup: Arc<dyn OrderLookup> = Arc::new(
        OrderApiClient::from_env(&desk_config.order_api)
            .inspect_err(|e| error!("Failed to build order API client: {}", e))?,
    );

    // 6. Shutdown on Ctrl+C
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutdown requested.");
        shutdown.cancel();
    });

    // 7. Run the bot; the token is read here, directly before use
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {}", e))
        .map_err(Error::EnvVar)?;

    bot::run_bot(token, Arc::new(desk_config), db, lookup, cancel).await?;
    info!("Bot stopped.");
    Ok(())
}
