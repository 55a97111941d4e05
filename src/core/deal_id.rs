//! Deal id discovery.
//!
//! A deal id is anything shaped like a UUID. Merchants paste them amid other text, so the
//! resolver validates candidates against the order system and only trusts the first one
//! the system knows. Ids found further up a reply chain are accepted as-is: the quoted
//! message was already handled when it was posted.

use crate::core::transport::{IncomingMessage, QuotedMessage};
use crate::order_api::OrderLookup;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

#[allow(clippy::expect_used)]
static DEAL_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("deal id pattern is a valid regex")
});

/// Every deal-id-shaped substring of `text`, left to right, lowercased
#[must_use]
pub fn extract_candidates(text: &str) -> Vec<String> {
    DEAL_ID_PATTERN
        .find_iter(text)
        .map(|found| found.as_str().to_ascii_lowercase())
        .collect()
}

/// First deal-id-shaped substring of `text`
#[must_use]
pub fn first_candidate(text: &str) -> Option<String> {
    DEAL_ID_PATTERN
        .find(text)
        .map(|found| found.as_str().to_ascii_lowercase())
}

fn own_candidates(text: Option<&str>, caption: Option<&str>) -> Vec<String> {
    [text, caption]
        .into_iter()
        .flatten()
        .flat_map(extract_candidates)
        .collect()
}

/// Walks a reply chain (parent first) and returns the first syntactic match
#[must_use]
pub fn find_in_chain(quoted: Option<&QuotedMessage>) -> Option<String> {
    let mut current = quoted;
    while let Some(message) = current {
        let found = [message.text.as_deref(), message.caption.as_deref()]
            .into_iter()
            .flatten()
            .find_map(first_candidate);
        if found.is_some() {
            return found;
        }
        current = message.reply_to.as_deref();
    }
    None
}

/// Finds the deal a message is about.
///
/// Candidates in the message's own text, then caption, are validated in order; the first
/// one the order system knows wins. A lookup failure counts as "not validated". If no
/// own candidate validates, the reply chain is searched without validation.
pub async fn resolve(
    message: &IncomingMessage,
    lookup: &dyn OrderLookup,
    requester: &str,
) -> Option<String> {
    for candidate in own_candidates(message.text.as_deref(), message.caption.as_deref()) {
        match lookup.get_order(&candidate, requester).await {
            Ok(Some(_)) => {
                debug!(deal_id = %candidate, "deal id validated");
                return Some(candidate);
            }
            Ok(None) => debug!(deal_id = %candidate, "candidate unknown to order system"),
            Err(e) => warn!(deal_id = %candidate, error = %e, "candidate lookup failed"),
        }
    }

    find_in_chain(message.reply_to.as_deref())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{ScriptedLookup, incoming, test_order};

    const KNOWN: &str = "a1b2c3d4-e5f6-7890-abcd-1234567890ab";
    const UNKNOWN: &str = "00000000-1111-2222-3333-444444444444";

    #[test]
    fn test_extract_candidates_in_order_lowercased() {
        let text = format!("first {UNKNOWN}, then {} and junk 1234-5678", KNOWN.to_uppercase());
        assert_eq!(extract_candidates(&text), vec![UNKNOWN, KNOWN]);
        assert!(extract_candidates("no ids here").is_empty());
    }

    #[tokio::test]
    async fn test_resolve_picks_the_validated_candidate() {
        let lookup = ScriptedLookup::new();
        lookup.set(KNOWN, test_order(KNOWN, "Acme"));

        let message = incoming("chat", "1", "u", &format!("hi {UNKNOWN} see {KNOWN} thx"));
        assert_eq!(resolve(&message, &lookup, "admin").await, Some(KNOWN.to_string()));
    }

    #[tokio::test]
    async fn test_resolve_checks_caption_after_text() {
        let lookup = ScriptedLookup::new();
        lookup.set(KNOWN, test_order(KNOWN, "Acme"));

        let mut message = incoming("chat", "1", "u", "receipt attached");
        message.caption = Some(format!("order {KNOWN}"));
        assert_eq!(resolve(&message, &lookup, "admin").await, Some(KNOWN.to_string()));
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_reply_chain_unvalidated() {
        let lookup = ScriptedLookup::new();

        let mut message = incoming("chat", "2", "u", "any news?");
        message.reply_to = Some(Box::new(QuotedMessage {
            text: Some("nothing here".to_string()),
            caption: None,
            reply_to: Some(Box::new(QuotedMessage {
                text: Some(format!("deal {UNKNOWN}")),
                caption: None,
                reply_to: None,
            })),
        }));

        assert_eq!(resolve(&message, &lookup, "admin").await, Some(UNKNOWN.to_string()));
        assert_eq!(lookup.calls(), 0);
    }

    #[tokio::test]
    async fn test_resolve_fails_closed_on_lookup_error() {
        let lookup = ScriptedLookup::new();
        lookup.fail(KNOWN);

        let message = incoming("chat", "1", "u", KNOWN);
        assert_eq!(resolve(&message, &lookup, "admin").await, None);
    }

    #[tokio::test]
    async fn test_resolve_none_without_candidates() {
        let lookup = ScriptedLookup::new();
        let message = incoming("chat", "1", "u", "hello");
        assert_eq!(resolve(&message, &lookup, "admin").await, None);
    }
}
