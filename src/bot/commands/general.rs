//! General Discord commands - greeting and help.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, commands::require_staff},
        core::templates,
        errors::{Error, Result},
    };

    /// Greets a staff member and confirms the bot is listening.
    #[poise::command(slash_command, prefix_command)]
    pub async fn start(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        require_staff(ctx).await?;
        ctx.say("👋 DealDesk is running. Use `/shift_start` to begin and `/help` for commands.")
            .await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        require_staff(ctx).await?;
        ctx.say(templates::help_text(&ctx.data().desk.config().admin_ids))
            .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
