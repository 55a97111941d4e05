//! Autocomplete handlers for Discord slash command parameters.
//!
//! Suggests merchant and cascade names as the user types.

use crate::{
    bot::BotData,
    core::{cascade, merchant},
    errors::Error,
};

/// Case-insensitive substring filter, sorted, capped at Discord's 25 suggestions.
fn matching(names: impl Iterator<Item = String>, partial: &str) -> Vec<String> {
    let partial_lower = partial.to_lowercase();
    let mut matching: Vec<String> = names
        .filter(|name| name.to_lowercase().contains(&partial_lower))
        .take(25)
        .collect();
    matching.sort();
    matching
}

/// Provides autocomplete suggestions for merchant names.
pub async fn autocomplete_merchant_name(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let Ok(merchants) = merchant::get_all_merchants(ctx.data().desk.db()).await else {
        return Vec::new();
    };
    matching(merchants.into_iter().map(|m| m.name), partial)
}

/// Provides autocomplete suggestions for cascade names.
pub async fn autocomplete_cascade_name(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let Ok(cascades) = cascade::get_all_cascades(ctx.data().desk.db()).await else {
        return Vec::new();
    };
    matching(cascades.into_iter().map(|c| c.name), partial)
}
