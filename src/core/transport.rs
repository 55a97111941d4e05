//! Platform-neutral chat surface.
//!
//! The desk only talks to the chat platform through [`ChatTransport`], and only receives
//! already-normalised [`IncomingMessage`] and [`ButtonPress`] values. The Discord
//! implementation lives in `bot::transport`.

use crate::core::action::Action;
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Where an outgoing message is delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatTarget {
    /// A channel (merchant chat, integrator chat, handler's home channel)
    Chat(String),
    /// A direct message to a user
    User(String),
}

/// Address of a message that has been sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    /// Channel the message lives in
    pub chat_id: String,
    /// Message identifier within the channel
    pub message_id: String,
}

impl MessageRef {
    /// Builds a reference from its parts
    #[must_use]
    pub fn new(chat_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            message_id: message_id.into(),
        }
    }
}

/// A file attached to a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    /// Where the platform serves the file from
    pub url: String,
    /// Original file name
    pub filename: String,
}

/// Visual weight of a button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    /// Neutral primary action
    Primary,
    /// Positive action
    Success,
    /// Destructive action
    Danger,
    /// Everything else
    Secondary,
}

/// One button; pressing it delivers `action` back to the desk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    /// Text on the button
    pub label: String,
    /// What the press means
    pub action: Action,
    /// Colour
    pub style: ButtonStyle,
}

impl Button {
    /// Creates a button
    #[must_use]
    pub fn new(label: impl Into<String>, action: Action, style: ButtonStyle) -> Self {
        Self {
            label: label.into(),
            action,
            style,
        }
    }
}

/// Rows of buttons attached to a message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    /// Button rows, top to bottom
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    /// Keyboard with one button per row
    #[must_use]
    pub fn column(buttons: Vec<Button>) -> Self {
        Self {
            rows: buttons.into_iter().map(|button| vec![button]).collect(),
        }
    }

    /// Keyboard with all buttons on one row
    #[must_use]
    pub fn row(buttons: Vec<Button>) -> Self {
        Self {
            rows: vec![buttons],
        }
    }

    /// Every action reachable from this keyboard
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.rows.iter().flatten().map(|button| &button.action)
    }
}

/// Message to send
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Body text
    pub text: String,
    /// Attachments, re-uploaded by the transport
    pub media: Vec<Media>,
    /// Buttons under the message
    pub keyboard: Option<Keyboard>,
    /// Message to reply to, only honoured when it is in the target chat
    pub reply_to: Option<MessageRef>,
}

impl OutgoingMessage {
    /// Plain text message
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Adds buttons
    #[must_use]
    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    /// Adds attachments
    #[must_use]
    pub fn with_media(mut self, media: Vec<Media>) -> Self {
        self.media = media;
        self
    }

    /// Sends as a reply
    #[must_use]
    pub fn replying_to(mut self, message: MessageRef) -> Self {
        self.reply_to = Some(message);
        self
    }
}

/// Outbound operations the desk needs from the chat platform
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends a message and returns where it landed
    async fn send(&self, target: &ChatTarget, message: OutgoingMessage) -> Result<MessageRef>;

    /// Replaces the text of a message the bot sent
    async fn edit_text(&self, message: &MessageRef, text: &str) -> Result<()>;

    /// Replaces (or with `None` removes) the buttons of a message the bot sent
    async fn edit_markup(&self, message: &MessageRef, keyboard: Option<Keyboard>) -> Result<()>;

    /// Deletes a message
    async fn delete(&self, message: &MessageRef) -> Result<()>;

    /// Adds an emoji reaction
    async fn set_reaction(&self, message: &MessageRef, emoji: &str) -> Result<()>;
}

/// A message another message replies to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotedMessage {
    /// Body text
    pub text: Option<String>,
    /// Attachment description
    pub caption: Option<String>,
    /// What this one replies to, if known
    pub reply_to: Option<Box<QuotedMessage>>,
}

/// An inbound message, stripped of platform detail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Channel it was posted in
    pub chat_id: String,
    /// Its identifier
    pub message_id: String,
    /// Who wrote it
    pub author_id: String,
    /// Whether the channel is a DM with the bot
    pub is_private: bool,
    /// Body text
    pub text: Option<String>,
    /// Attachment description
    pub caption: Option<String>,
    /// Attachments
    pub media: Vec<Media>,
    /// The message it replies to
    pub reply_to: Option<Box<QuotedMessage>>,
    /// When it was originally posted
    pub posted_at: DateTime<Utc>,
}

impl IncomingMessage {
    /// Address of this message
    #[must_use]
    pub fn reference(&self) -> MessageRef {
        MessageRef::new(&self.chat_id, &self.message_id)
    }

    /// Text followed by caption, for keyword checks
    #[must_use]
    pub fn full_text(&self) -> String {
        [self.text.as_deref(), self.caption.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A button press, with the action already decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonPress {
    /// Decoded action
    pub action: Action,
    /// Channel of the message carrying the button
    pub chat_id: String,
    /// Message carrying the button
    pub message_id: String,
    /// Who pressed
    pub actor_id: String,
    /// Current text of the message carrying the button
    pub text: String,
    /// Attachments of the message carrying the button
    pub media: Vec<Media>,
}

impl ButtonPress {
    /// Address of the message carrying the button
    #[must_use]
    pub fn reference(&self) -> MessageRef {
        MessageRef::new(&self.chat_id, &self.message_id)
    }
}
