//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Admin-only configuration commands
pub mod admin;

/// Staff desk commands (shifts, stats, merchants, appeals)
pub mod desk;

/// General utility commands
pub mod general;

use crate::{
    bot::BotData,
    core::staff,
    errors::{Error, Result},
};

// Export commands
pub use admin::*;
pub use desk::*;
pub use general::*;

/// Every command the bot registers.
#[must_use]
pub fn all() -> Vec<poise::Command<BotData, Error>> {
    vec![
        start(),
        help(),
        merchant_list(),
        shift_start(),
        shift_stop(),
        stats(),
        get_chats(),
        list_cascades(),
        appeal(),
        link(),
        add_merchant(),
        delete_merchant(),
        bind_merchant(),
        add_cascade(),
        delete_cascade(),
        candles(),
        add_user(),
        remove_user(),
    ]
}

/// Fails with `Unauthorized` unless the invoking user is staff.
pub(crate) async fn require_staff(ctx: poise::Context<'_, BotData, Error>) -> Result<String> {
    let author = ctx.author().id.to_string();
    let desk = &ctx.data().desk;
    staff::require_staff(desk.db(), desk.config(), &author, &ctx.command().name).await?;
    Ok(author)
}

/// Fails with `Unauthorized` unless the invoking user is an admin.
pub(crate) fn require_admin(ctx: poise::Context<'_, BotData, Error>) -> Result<String> {
    let author = ctx.author().id.to_string();
    staff::require_admin(ctx.data().desk.config(), &author, &ctx.command().name)?;
    Ok(author)
}
