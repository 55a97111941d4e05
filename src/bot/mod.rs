//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for the deal desk: slash commands,
//! gateway event handling, and the [`ChatTransport`](crate::core::transport::ChatTransport)
//! implementation the desk sends through.

/// Discord command implementations (general, desk, admin)
pub mod commands;
/// Discord interaction handlers (events, autocomplete)
pub mod handlers;
/// Discord implementation of the chat transport
pub mod transport;

use crate::{
    config::DeskConfig,
    core::{DealDesk, run_sweeper},
    errors::{Error, Result},
    order_api::OrderLookup,
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

pub use transport::DiscordTransport;

/// Shared data available to all bot commands and event handlers.
pub struct BotData {
    /// The desk every command and event is routed to
    pub desk: Arc<DealDesk>,
}

impl BotData {
    /// Creates a new `BotData` around a desk.
    #[must_use]
    pub const fn new(desk: Arc<DealDesk>) -> Self {
        Self { desk }
    }
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            let reply = if error.is_user_facing() {
                format!("⚠️ {error}")
            } else {
                error!("Error in command `{}`: {:?}", ctx.command().name, error);
                let author = ctx.author().id.to_string();
                ctx.data().desk.report_error(&error, Some(&author)).await;
                "⚠️ Something went wrong, the admins have been notified.".to_string()
            };
            if let Err(e) = ctx.say(reply).await {
                error!("Failed to send error message: {}", e);
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

/// Connects to Discord and serves until `cancel` fires or the client fails.
///
/// The reconciliation sweep is started once the bot is logged in and stops with it.
#[instrument(skip_all)]
pub async fn run_bot(
    token: String,
    config: Arc<DeskConfig>,
    db: DatabaseConnection,
    lookup: Arc<dyn OrderLookup>,
    cancel: CancellationToken,
) -> Result<()> {
    let sweeper_cancel = cancel.clone();
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            on_error: |error| Box::pin(on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(handlers::event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let transport = Arc::new(DiscordTransport::new(Arc::clone(&ctx.http)));
                let desk = Arc::new(DealDesk::new(db, lookup, transport, config)?);
                tokio::spawn(run_sweeper(Arc::clone(&desk), sweeper_cancel));
                Ok(BotData::new(desk))
            })
        })
        .build();

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::Client::builder(&token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {:?}", e))?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        cancel.cancelled().await;
        info!("Shutting down shards...");
        shard_manager.shutdown_all().await;
    });

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {:?}", e))?;
    Ok(())
}
