//! Admin Discord commands - merchants, integrators, chat bindings and the staff roster.
//!
//! Every command here is refused for anyone not listed in `admin_ids`.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, commands::require_admin, handlers::autocomplete},
        core::{
            cascade::{self, CascadeUpdate},
            merchant, staff,
        },
        errors::{Error, Result},
    };
    use chrono::Utc;
    use poise::serenity_prelude as serenity;

    /// What `/link` binds a chat to
    #[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
    pub enum LinkKind {
        #[name = "m"]
        Merchant,
        #[name = "i"]
        Integrator,
    }

    /// Binds a chat to a merchant or an integrator.
    ///
    /// Binding a merchant also makes you its handler.
    #[poise::command(slash_command, prefix_command)]
    pub async fn link(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "m = merchant, i = integrator"] kind: LinkKind,
        #[description = "Merchant or integrator name"] name: String,
        #[description = "Chat id (default: this channel)"] chat_id: Option<String>,
    ) -> Result<()> {
        let author = require_admin(ctx)?;
        let db = ctx.data().desk.db();
        let chat_id = chat_id.unwrap_or_else(|| ctx.channel_id().to_string());
        if chat_id.parse::<u64>().is_err() {
            ctx.say(format!("❌ Invalid chat id: {chat_id}")).await?;
            return Ok(());
        }

        match kind {
            LinkKind::Merchant => {
                merchant::get_merchant_by_name(db, &name)
                    .await?
                    .ok_or_else(|| Error::NotFound {
                        entity: "Merchant",
                        name: name.clone(),
                    })?;
                merchant::bind_chat(db, &name, &chat_id).await?;
                merchant::set_handler(db, &name, Some(author)).await?;
                ctx.say(format!("🔗 Merchant {name} bound to <#{chat_id}>"))
                    .await?;
            }
            LinkKind::Integrator => {
                if !cascade::get_all_cascades(db).await?.iter().any(|c| c.name == name) {
                    return Err(Error::NotFound {
                        entity: "Cascade",
                        name,
                    });
                }
                cascade::merge_cascade(
                    db,
                    CascadeUpdate {
                        chat_id: Some(chat_id.clone()),
                        ..CascadeUpdate::named(&name)
                    },
                )
                .await?;
                ctx.say(format!("🔗 Integrator {name} bound to <#{chat_id}>"))
                    .await?;
            }
        }
        Ok(())
    }

    /// Registers a merchant.
    #[poise::command(slash_command, prefix_command)]
    pub async fn add_merchant(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Unique merchant name"] name: String,
        #[description = "Name shown in messages (default: the name)"] display_name: Option<String>,
        #[description = "Handler (default: none)"] handler: Option<serenity::User>,
    ) -> Result<()> {
        require_admin(ctx)?;
        let display_name = display_name.unwrap_or_else(|| name.clone());
        let created = merchant::create_merchant(
            ctx.data().desk.db(),
            &name,
            &display_name,
            None,
            handler.map(|user| user.id.to_string()),
        )
        .await?;
        ctx.say(format!("✅ Merchant {} added 🏪", created.name)).await?;
        Ok(())
    }

    /// Removes a merchant.
    #[poise::command(slash_command, prefix_command)]
    pub async fn delete_merchant(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Merchant name"]
        #[autocomplete = "autocomplete::autocomplete_merchant_name"]
        name: String,
    ) -> Result<()> {
        require_admin(ctx)?;
        merchant::delete_merchant(ctx.data().desk.db(), &name).await?;
        ctx.say(format!("🗑️ Merchant {name} deleted")).await?;
        Ok(())
    }

    /// Assigns a merchant's handler, registering the merchant if needed.
    #[poise::command(slash_command, prefix_command)]
    pub async fn bind_merchant(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Merchant name"]
        #[autocomplete = "autocomplete::autocomplete_merchant_name"]
        name: String,
        #[description = "Handler (default: you)"] handler: Option<serenity::User>,
    ) -> Result<()> {
        let author = require_admin(ctx)?;
        let db = ctx.data().desk.db();
        let handler_id = handler.map_or(author, |user| user.id.to_string());

        if merchant::get_merchant_by_name(db, &name).await?.is_none() {
            merchant::create_merchant(db, &name, &name, None, None).await?;
        }
        merchant::set_handler(db, &name, Some(handler_id.clone())).await?;
        ctx.say(format!("🔗 Merchant {name} bound to <@{handler_id}> 🏪"))
            .await?;
        Ok(())
    }

    /// Registers an integrator.
    #[poise::command(slash_command, prefix_command)]
    pub async fn add_cascade(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Integrator name as reported by the order system"] name: String,
    ) -> Result<()> {
        require_admin(ctx)?;
        let merged = cascade::merge_cascade(ctx.data().desk.db(), CascadeUpdate::named(&name)).await?;
        ctx.say(format!("✅ Integrator {} added 🤝", merged.name)).await?;
        Ok(())
    }

    /// Removes an integrator.
    #[poise::command(slash_command, prefix_command)]
    pub async fn delete_cascade(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Integrator name"]
        #[autocomplete = "autocomplete::autocomplete_cascade_name"]
        name: String,
    ) -> Result<()> {
        require_admin(ctx)?;
        cascade::delete_cascade(ctx.data().desk.db(), &name).await?;
        ctx.say(format!("🗑️ Integrator {name} deleted")).await?;
        Ok(())
    }

    /// Turns the integrator's own order id requirement on or off.
    #[poise::command(slash_command, prefix_command)]
    pub async fn candles(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Integrator name"]
        #[autocomplete = "autocomplete::autocomplete_cascade_name"]
        name: String,
        #[description = "Require the external order id"] enabled: bool,
    ) -> Result<()> {
        require_admin(ctx)?;
        cascade::merge_cascade(
            ctx.data().desk.db(),
            CascadeUpdate {
                needs_external_id: Some(enabled),
                ..CascadeUpdate::named(&name)
            },
        )
        .await?;
        let state = if enabled { "on" } else { "off" };
        ctx.say(format!("✅ Integrator {name}: external id {state} ✨"))
            .await?;
        Ok(())
    }

    /// Adds a staff member.
    #[poise::command(slash_command, prefix_command)]
    pub async fn add_user(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "User to add"] user: serenity::User,
    ) -> Result<()> {
        let author = require_admin(ctx)?;
        staff::add_staff(ctx.data().desk.db(), &user.id.to_string(), &author, Utc::now()).await?;
        ctx.say(format!("✅ User {} added 👤", user.name)).await?;
        Ok(())
    }

    /// Removes a staff member.
    #[poise::command(slash_command, prefix_command)]
    pub async fn remove_user(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "User to remove"] user: serenity::User,
    ) -> Result<()> {
        require_admin(ctx)?;
        staff::remove_staff(ctx.data().desk.db(), &user.id.to_string()).await?;
        ctx.say(format!("🗑️ User {} removed 👤", user.name)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
