//! Staff desk commands - shifts, statistics, merchant claims, chats and appeals.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, commands::require_staff, transport::components},
        core::{appeal, cascade, deal, merchant, shift, stats, templates},
        entities::DealStatus,
        errors::{Error, Result},
    };
    use chrono::Utc;
    use tracing::info;

    /// Shows every merchant with a button to claim or release it.
    #[poise::command(slash_command, prefix_command)]
    pub async fn merchant_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let author = require_staff(ctx).await?;
        let merchants = merchant::get_all_merchants(ctx.data().desk.db()).await?;
        if merchants.is_empty() {
            ctx.say("🏠 No merchants registered.").await?;
            return Ok(());
        }

        let keyboard = templates::merchant_keyboard(&merchants, &author);
        ctx.send(
            poise::CreateReply::default()
                .content("🏪 Merchants (✅ = yours):")
                .components(components(&keyboard)),
        )
        .await?;
        Ok(())
    }

    /// Opens a shift for the invoking staff member.
    #[poise::command(slash_command, prefix_command)]
    pub async fn shift_start(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let author = require_staff(ctx).await?;
        let desk = &ctx.data().desk;
        let now = Utc::now();
        shift::start_shift(desk.db(), &author, now).await?;
        info!(user_id = %author, "shift started");
        ctx.say(templates::shift_started(&desk.policy().local_time(now)))
            .await?;
        Ok(())
    }

    /// Asks for confirmation before closing the shift.
    ///
    /// Closing purges every deal that is not waiting on an integrator.
    #[poise::command(slash_command, prefix_command)]
    pub async fn shift_stop(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        require_staff(ctx).await?;
        ctx.send(
            poise::CreateReply::default()
                .content(templates::SHIFT_STOP_CONFIRM)
                .components(components(&templates::shift_confirm_keyboard())),
        )
        .await?;
        Ok(())
    }

    /// Shows today's statistics for the invoking staff member.
    #[poise::command(slash_command, prefix_command)]
    pub async fn stats(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let author = require_staff(ctx).await?;
        let desk = &ctx.data().desk;
        let date = desk.today(Utc::now());

        let day_stats = stats::get_stats(desk.db(), &author, date).await?;
        let pending: Vec<String> =
            deal::get_deals_by_status(desk.db(), &[DealStatus::AwaitingIntegrator])
                .await?
                .into_iter()
                .map(|deal| deal.deal_id)
                .collect();
        let report = templates::stats_report(
            &date.format("%Y-%m-%d").to_string(),
            &ctx.author().name,
            &day_stats,
            &pending,
        )?;
        ctx.say(report).await?;
        Ok(())
    }

    /// Lists merchant and integrator chats.
    #[poise::command(slash_command, prefix_command)]
    pub async fn get_chats(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        require_staff(ctx).await?;
        let db = ctx.data().desk.db();
        let merchants = merchant::get_all_merchants(db).await?;
        let cascades = cascade::get_all_cascades(db).await?;
        ctx.say(templates::chat_list(&merchants, &cascades)).await?;
        Ok(())
    }

    /// Lists integrators with their chats and external id requirement.
    #[poise::command(slash_command, prefix_command)]
    pub async fn list_cascades(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        require_staff(ctx).await?;
        let cascades = cascade::get_all_cascades(ctx.data().desk.db()).await?;
        ctx.say(templates::cascade_list(&cascades)).await?;
        Ok(())
    }

    /// Opens an appeal on a deal; proofs sent to the bot in DM are forwarded to you.
    #[poise::command(slash_command, prefix_command)]
    pub async fn appeal(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Deal id"] deal_id: String,
        #[description = "Handled manually, outside the integrator (default: false)"]
        manual: Option<bool>,
    ) -> Result<()> {
        let author = require_staff(ctx).await?;
        let desk = &ctx.data().desk;
        let deal_id = deal_id.trim().to_lowercase();

        desk.lookup()
            .get_order(&deal_id, &author)
            .await?
            .ok_or_else(|| Error::DealNotFound {
                deal_id: deal_id.clone(),
            })?;
        appeal::create_appeal(desk.db(), &deal_id, &author, manual.unwrap_or(false), Utc::now())
            .await?;
        info!(deal_id = %deal_id, owner = %author, "appeal opened");

        ctx.say(format!(
            "⚖️ Appeal opened for `{deal_id}`. Proofs sent to me in DM will be forwarded to you."
        ))
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
