//! Shared test utilities for the deal desk.
//!
//! In-memory database setup, entity builders with sensible defaults, and scripted
//! stand-ins for the order system and the chat platform.

#![allow(clippy::unwrap_used)]

use crate::{
    config::DeskConfig,
    core::{
        DealDesk,
        cascade::{self, CascadeUpdate},
        deal::{self, NewDeal},
        merchant,
        transport::{ChatTarget, ChatTransport, IncomingMessage, Keyboard, MessageRef, OutgoingMessage},
    },
    entities,
    errors::{Error, Result},
    order_api::{OrderLookup, OrderRecord, OrderStatus},
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::DatabaseConnection;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Notify, OwnedMutexGuard};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Default configuration with a single admin, `admin`.
pub fn test_config() -> DeskConfig {
    DeskConfig {
        admin_ids: vec!["admin".to_string()],
        ..DeskConfig::default()
    }
}

/// Desk over `db` with [`test_config`].
pub fn test_desk(
    db: DatabaseConnection,
    lookup: Arc<ScriptedLookup>,
    transport: Arc<RecordingTransport>,
) -> Result<DealDesk> {
    test_desk_with(db, lookup, transport, test_config())
}

/// Desk over `db` with a custom configuration.
pub fn test_desk_with(
    db: DatabaseConnection,
    lookup: Arc<ScriptedLookup>,
    transport: Arc<RecordingTransport>,
    config: DeskConfig,
) -> Result<DealDesk> {
    DealDesk::new(db, lookup, transport, Arc::new(config))
}

/// An order in `processing` for merchant `Shop123`.
pub fn test_order(deal_id: &str, integrator: &str) -> OrderRecord {
    OrderRecord {
        id: deal_id.to_string(),
        merchant_name: "Shop123".to_string(),
        integrator_name: integrator.to_string(),
        recipient: "Ivan P.".to_string(),
        payment_instrument: "2200 1234 5678 9012".to_string(),
        bank_name: "Test Bank".to_string(),
        is_instant_payment: false,
        sum: 1500.0,
        currency: "RUB".to_string(),
        status: OrderStatus::Processing,
        created_at: Some(Utc::now()),
        external_order_id: None,
    }
}

/// A message in a shared chat, posted now.
pub fn incoming(chat_id: &str, message_id: &str, author_id: &str, text: &str) -> IncomingMessage {
    IncomingMessage {
        chat_id: chat_id.to_string(),
        message_id: message_id.to_string(),
        author_id: author_id.to_string(),
        is_private: false,
        text: Some(text.to_string()),
        caption: None,
        media: Vec::new(),
        reply_to: None,
        posted_at: Utc::now(),
    }
}

/// Creates an `awaiting` deal posted now as message `1` of `chat_id`.
pub async fn create_test_deal(
    db: &DatabaseConnection,
    deal_id: &str,
    chat_id: &str,
    handler_id: &str,
) -> Result<entities::deal::Model> {
    deal::create_deal(
        db,
        NewDeal {
            deal_id: deal_id.to_string(),
            merchant_chat_id: chat_id.to_string(),
            message_id: "1".to_string(),
            sent_time: Utc::now(),
            merchant_id: None,
            handler_id: handler_id.to_string(),
        },
    )
    .await
}

/// Creates a merchant bound to `chat_id`, displayed under its own name.
pub async fn create_test_merchant(
    db: &DatabaseConnection,
    name: &str,
    chat_id: &str,
    handler_id: Option<&str>,
) -> Result<entities::merchant::Model> {
    merchant::create_merchant(
        db,
        name,
        name,
        Some(chat_id.to_string()),
        handler_id.map(str::to_string),
    )
    .await
}

/// Creates a cascade bound to `chat_id`.
pub async fn create_test_cascade(
    db: &DatabaseConnection,
    name: &str,
    chat_id: &str,
) -> Result<entities::cascade::Model> {
    cascade::merge_cascade(
        db,
        CascadeUpdate {
            chat_id: Some(chat_id.to_string()),
            ..CascadeUpdate::named(name)
        },
    )
    .await
}

/// Order lookup answering from a script.
#[derive(Default)]
pub struct ScriptedLookup {
    orders: Mutex<HashMap<String, OrderRecord>>,
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl ScriptedLookup {
    /// Empty script: every id is unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `deal_id` resolve to `order`.
    pub fn set(&self, deal_id: &str, order: OrderRecord) {
        self.orders.lock().unwrap().insert(deal_id.to_string(), order);
    }

    /// Changes the status of an already scripted order.
    pub fn set_status(&self, deal_id: &str, status: OrderStatus) {
        if let Some(order) = self.orders.lock().unwrap().get_mut(deal_id) {
            order.status = status;
        }
    }

    /// Makes lookups of `deal_id` fail.
    pub fn fail(&self, deal_id: &str) {
        self.failing.lock().unwrap().insert(deal_id.to_string());
    }

    /// Number of lookups made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderLookup for ScriptedLookup {
    async fn get_order(&self, deal_id: &str, _requester: &str) -> Result<Option<OrderRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(deal_id) {
            return Err(Error::OrderLookup {
                deal_id: deal_id.to_string(),
                message: "scripted failure".to_string(),
            });
        }
        Ok(self.orders.lock().unwrap().get(deal_id).cloned())
    }
}

/// Chat transport that records everything it is asked to do.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(ChatTarget, OutgoingMessage)>>,
    text_edits: Mutex<Vec<(MessageRef, String)>>,
    markup_edits: Mutex<Vec<(MessageRef, Option<Keyboard>)>>,
    deletes: Mutex<Vec<MessageRef>>,
    reactions: Mutex<Vec<(MessageRef, String)>>,
    failing: AtomicBool,
    next_id: AtomicUsize,
    gate: Arc<tokio::sync::Mutex<()>>,
    entered: Notify,
}

impl RecordingTransport {
    /// Transport where every call succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent send fail (or succeed again).
    pub fn fail_sends(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    /// Parks every send until the returned guard drops.
    pub async fn hold_sends(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.gate).lock_owned().await
    }

    /// Resolves once a send has started, held or not.
    pub async fn send_started(&self) {
        self.entered.notified().await;
    }

    /// Every message sent, in order.
    pub fn sent(&self) -> Vec<(ChatTarget, OutgoingMessage)> {
        self.sent.lock().unwrap().clone()
    }

    /// Messages sent to `target`, in order.
    pub fn sent_to(&self, target: &ChatTarget) -> Vec<OutgoingMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == target)
            .map(|(_, message)| message.clone())
            .collect()
    }

    /// Text edits, in order.
    pub fn text_edits(&self) -> Vec<(MessageRef, String)> {
        self.text_edits.lock().unwrap().clone()
    }

    /// Button edits, in order.
    pub fn markup_edits(&self) -> Vec<(MessageRef, Option<Keyboard>)> {
        self.markup_edits.lock().unwrap().clone()
    }

    /// Deleted messages, in order.
    pub fn deletes(&self) -> Vec<MessageRef> {
        self.deletes.lock().unwrap().clone()
    }

    /// Reactions set, in order.
    pub fn reactions(&self) -> Vec<(MessageRef, String)> {
        self.reactions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send(&self, target: &ChatTarget, message: OutgoingMessage) -> Result<MessageRef> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Transport {
                message: "scripted send failure".to_string(),
            });
        }
        self.entered.notify_one();
        drop(self.gate.lock().await);
        let chat_id = match target {
            ChatTarget::Chat(id) => id.clone(),
            ChatTarget::User(id) => format!("dm-{id}"),
        };
        let message_id = format!("m{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.sent.lock().unwrap().push((target.clone(), message));
        Ok(MessageRef::new(chat_id, message_id))
    }

    async fn edit_text(&self, message: &MessageRef, text: &str) -> Result<()> {
        self.text_edits
            .lock()
            .unwrap()
            .push((message.clone(), text.to_string()));
        Ok(())
    }

    async fn edit_markup(&self, message: &MessageRef, keyboard: Option<Keyboard>) -> Result<()> {
        self.markup_edits.lock().unwrap().push((message.clone(), keyboard));
        Ok(())
    }

    async fn delete(&self, message: &MessageRef) -> Result<()> {
        self.deletes.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn set_reaction(&self, message: &MessageRef, emoji: &str) -> Result<()> {
        self.reactions
            .lock()
            .unwrap()
            .push((message.clone(), emoji.to_string()));
        Ok(())
    }
}
