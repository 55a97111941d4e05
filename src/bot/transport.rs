//! [`ChatTransport`] over the Discord HTTP API.
//!
//! Chats are channels, private chats are DM channels, keyboards are button rows whose
//! `custom_id` is the encoded [`Action`](crate::core::action::Action).

use crate::core::transport::{
    ButtonStyle, ChatTarget, ChatTransport, Keyboard, MessageRef, OutgoingMessage,
};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::warn;

/// Discord implementation of the desk's chat surface
pub struct DiscordTransport {
    http: Arc<serenity::Http>,
}

impl DiscordTransport {
    /// Wraps the client's HTTP handle
    #[must_use]
    pub const fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }

    async fn channel(&self, target: &ChatTarget) -> Result<serenity::ChannelId> {
        match target {
            ChatTarget::Chat(id) => Ok(serenity::ChannelId::new(parse_id(id)?)),
            ChatTarget::User(id) => {
                let user = serenity::UserId::new(parse_id(id)?);
                let dm = user.create_dm_channel(&self.http).await?;
                Ok(dm.id)
            }
        }
    }
}

/// Parses a Discord snowflake kept as a string.
fn parse_id(raw: &str) -> Result<u64> {
    match raw.parse::<u64>() {
        Ok(id) if id != 0 => Ok(id),
        _ => Err(Error::Transport {
            message: format!("invalid Discord id: {raw}"),
        }),
    }
}

fn message_ids(message: &MessageRef) -> Result<(serenity::ChannelId, serenity::MessageId)> {
    Ok((
        serenity::ChannelId::new(parse_id(&message.chat_id)?),
        serenity::MessageId::new(parse_id(&message.message_id)?),
    ))
}

const fn button_style(style: ButtonStyle) -> serenity::ButtonStyle {
    match style {
        ButtonStyle::Primary => serenity::ButtonStyle::Primary,
        ButtonStyle::Success => serenity::ButtonStyle::Success,
        ButtonStyle::Danger => serenity::ButtonStyle::Danger,
        ButtonStyle::Secondary => serenity::ButtonStyle::Secondary,
    }
}

pub(crate) fn components(keyboard: &Keyboard) -> Vec<serenity::CreateActionRow> {
    keyboard
        .rows
        .iter()
        .map(|row| {
            serenity::CreateActionRow::Buttons(
                row.iter()
                    .map(|button| {
                        serenity::CreateButton::new(button.action.encode())
                            .label(&button.label)
                            .style(button_style(button.style))
                    })
                    .collect(),
            )
        })
        .collect()
}

#[async_trait]
impl ChatTransport for DiscordTransport {
    async fn send(&self, target: &ChatTarget, message: OutgoingMessage) -> Result<MessageRef> {
        let channel = self.channel(target).await?;

        let mut builder = serenity::CreateMessage::new().content(&message.text);
        if let Some(keyboard) = &message.keyboard {
            builder = builder.components(components(keyboard));
        }
        // A reply across channels is rejected by Discord.
        if let Some(reply_to) = &message.reply_to {
            let (reply_channel, reply_id) = message_ids(reply_to)?;
            if reply_channel == channel {
                builder = builder.reference_message((reply_channel, reply_id));
            }
        }
        for media in &message.media {
            match serenity::CreateAttachment::url(&self.http, &media.url).await {
                Ok(attachment) => builder = builder.add_file(attachment),
                Err(e) => warn!(url = %media.url, error = %e, "could not fetch attachment"),
            }
        }

        let sent = channel.send_message(&self.http, builder).await?;
        Ok(MessageRef::new(sent.channel_id.to_string(), sent.id.to_string()))
    }

    async fn edit_text(&self, message: &MessageRef, text: &str) -> Result<()> {
        let (channel, id) = message_ids(message)?;
        channel
            .edit_message(&self.http, id, serenity::EditMessage::new().content(text))
            .await?;
        Ok(())
    }

    async fn edit_markup(&self, message: &MessageRef, keyboard: Option<Keyboard>) -> Result<()> {
        let (channel, id) = message_ids(message)?;
        let rows = keyboard.as_ref().map(components).unwrap_or_default();
        channel
            .edit_message(&self.http, id, serenity::EditMessage::new().components(rows))
            .await?;
        Ok(())
    }

    async fn delete(&self, message: &MessageRef) -> Result<()> {
        let (channel, id) = message_ids(message)?;
        channel.delete_message(&self.http, id).await?;
        Ok(())
    }

    async fn set_reaction(&self, message: &MessageRef, emoji: &str) -> Result<()> {
        let (channel, id) = message_ids(message)?;
        channel
            .create_reaction(&self.http, id, serenity::ReactionType::Unicode(emoji.to_string()))
            .await?;
        Ok(())
    }
}
