//! Gateway events: new messages, edits and button presses.
//!
//! Discord payloads are normalised into the desk's platform-neutral types here and
//! nowhere else.

use crate::{
    bot::BotData,
    core::{
        action::Action,
        transport::{ButtonPress, IncomingMessage, Media, QuotedMessage},
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use tracing::{debug, warn};

/// Routes gateway events to the desk.
///
/// Failures of the desk are handled here; only failures to talk to Discord itself are
/// returned to the framework.
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, BotData, Error>,
    data: &BotData,
) -> Result<()> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if new_message.author.bot {
                return Ok(());
            }
            let message = incoming(new_message);
            if let Err(e) = data.desk.handle_message(&message).await {
                report(data, &e, None).await;
            }
        }
        serenity::FullEvent::MessageUpdate { event, .. } => {
            let edited = event.channel_id.message(&ctx.http, event.id).await?;
            if edited.author.bot {
                return Ok(());
            }
            let edited_at = edited.edited_timestamp.map_or_else(Utc::now, to_utc);
            if let Err(e) = data.desk.handle_edit(&incoming(&edited), edited_at).await {
                report(data, &e, None).await;
            }
        }
        serenity::FullEvent::InteractionCreate {
            interaction: serenity::Interaction::Component(component),
        } => on_button(ctx, data, component).await?,
        _ => {}
    }
    Ok(())
}

async fn on_button(
    ctx: &serenity::Context,
    data: &BotData,
    component: &serenity::ComponentInteraction,
) -> Result<()> {
    component
        .create_response(&ctx.http, serenity::CreateInteractionResponse::Acknowledge)
        .await?;

    let actor_id = component.user.id.to_string();
    let result = match Action::parse(&component.data.custom_id) {
        Ok(action) => data.desk.handle_press(&press(action, component)).await,
        Err(e) => Err(e),
    };
    let Err(error) = result else {
        return Ok(());
    };

    report(data, &error, Some(&actor_id)).await;
    let reply = if error.is_user_facing() {
        format!("⚠️ {error}")
    } else {
        "⚠️ Something went wrong, the admins have been notified.".to_string()
    };
    component
        .create_followup(
            &ctx.http,
            serenity::CreateInteractionResponseFollowup::new()
                .content(reply)
                .ephemeral(true),
        )
        .await?;
    Ok(())
}

/// Refusals are logged; faults also go to the operators.
async fn report(data: &BotData, error: &Error, actor_id: Option<&str>) {
    if error.is_user_facing() {
        debug!(error = %error, "request refused");
    } else {
        warn!(error = %error, "event handling failed");
        data.desk.report_error(error, actor_id).await;
    }
}

fn to_utc(timestamp: serenity::Timestamp) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp.unix_timestamp(), 0).unwrap_or_else(Utc::now)
}

fn non_empty(text: &str) -> Option<String> {
    (!text.trim().is_empty()).then(|| text.to_string())
}

/// Embed descriptions stand in for attachment captions.
fn caption(message: &serenity::Message) -> Option<String> {
    let parts: Vec<&str> = message
        .embeds
        .iter()
        .filter_map(|embed| embed.description.as_deref())
        .collect();
    non_empty(&parts.join("\n"))
}

fn media(attachments: &[serenity::Attachment]) -> Vec<Media> {
    attachments
        .iter()
        .map(|attachment| Media {
            url: attachment.url.clone(),
            filename: attachment.filename.clone(),
        })
        .collect()
}

fn quoted(message: &serenity::Message) -> QuotedMessage {
    QuotedMessage {
        text: non_empty(&message.content),
        caption: caption(message),
        reply_to: message
            .referenced_message
            .as_deref()
            .map(|parent| Box::new(quoted(parent))),
    }
}

fn incoming(message: &serenity::Message) -> IncomingMessage {
    IncomingMessage {
        chat_id: message.channel_id.to_string(),
        message_id: message.id.to_string(),
        author_id: message.author.id.to_string(),
        is_private: message.guild_id.is_none(),
        text: non_empty(&message.content),
        caption: caption(message),
        media: media(&message.attachments),
        reply_to: message
            .referenced_message
            .as_deref()
            .map(|parent| Box::new(quoted(parent))),
        posted_at: to_utc(message.timestamp),
    }
}

fn press(action: Action, component: &serenity::ComponentInteraction) -> ButtonPress {
    ButtonPress {
        action,
        chat_id: component.channel_id.to_string(),
        message_id: component.message.id.to_string(),
        actor_id: component.user.id.to_string(),
        text: component.message.content.clone(),
        media: media(&component.message.attachments),
    }
}
