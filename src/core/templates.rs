//! Message texts and keyboards.
//!
//! Texts use Discord markdown. Deal ids are always rendered as inline code so they can be
//! copied with one click.

use crate::core::action::{Action, RejectReason};
use crate::core::sla::SlaPolicy;
use crate::core::stats::DailyStats;
use crate::core::transport::{Button, ButtonStyle, Keyboard};
use crate::entities::{cascade, merchant};
use crate::order_api::OrderRecord;
use std::fmt::Write;

/// Marker appended to a handler message taken into manual processing
pub const VIEWED: &str = "👁️ Viewed\n———————\nTaken into manual processing.";

/// Marker appended to a declined integrator proof
pub const PROOF_DECLINED: &str = "\n———————\n🔴 You declined this proof";

/// Shift close confirmation prompt
pub const SHIFT_STOP_CONFIRM: &str = "🛑 Confirm the end of your shift:";

/// Reply to a cancelled shift close
pub const SHIFT_STOP_CANCELLED: &str = "❌ Cancelled";

/// Deal summary sent to handlers and integrators.
///
/// The integrator's own order id is shown only for cascades that require it.
pub fn deal_summary(
    order: &OrderRecord,
    cascade: Option<&cascade::Model>,
    policy: &SlaPolicy,
) -> Result<String, std::fmt::Error> {
    let mut text = String::new();
    writeln!(text, "🆔 Deal: `{}`", order.id)?;
    writeln!(text, "🏪 Merchant: {}", order.merchant_name)?;
    writeln!(text, "🤝 Integrator: {}", order.integrator_name)?;
    writeln!(text, "👤 Recipient: {}", order.recipient)?;
    writeln!(text, "💳 Details: {}", order.payment_instrument)?;
    writeln!(text, "🏦 Bank: {}", order.bank_name)?;
    writeln!(
        text,
        "💸 Type: {}",
        if order.is_instant_payment { "SBP" } else { "Card" }
    )?;
    writeln!(text, "💰 Amount: {:.2} {}", order.sum, order.currency)?;
    writeln!(text, "📊 Status: {}", order.status)?;
    match order.created_at {
        Some(created_at) => writeln!(text, "📅 Created: {}", policy.local_timestamp(created_at))?,
        None => writeln!(text, "📅 Created: unknown")?,
    }
    let needs_external_id = cascade.is_some_and(|cascade| cascade.needs_external_id);
    if let (true, Some(external)) = (needs_external_id, &order.external_order_id) {
        writeln!(text, "🔗 Integrator order id: `{external}`")?;
    }
    Ok(text.trim_end().to_string())
}

/// Acknowledgement in the merchant chat
#[must_use]
pub fn deal_accepted(deal_id: &str) -> String {
    format!("✅ Deal `{deal_id}` accepted for processing! 🛠️")
}

/// Completion notice for the merchant
#[must_use]
pub fn deal_completed(deal_id: &str) -> String {
    format!("✔️ Deal `{deal_id}` completed! 🎉")
}

/// Rejection notice for the merchant
#[must_use]
pub fn deal_rejected(deal_id: &str, reason: RejectReason) -> String {
    format!("❌ Deal `{deal_id}` rejected: {reason} 🚫")
}

/// Rejection notice for admins
#[must_use]
pub fn rejection_notice(deal_id: &str, reason: RejectReason, actor_id: &str) -> String {
    format!("⚠️ Deal `{deal_id}` rejected by <@{actor_id}>: {reason}")
}

/// Breach notice for the handler
#[must_use]
pub fn sla_expired(deal_id: &str, merchant_name: &str) -> String {
    format!("⏰ SLA expired for deal `{deal_id}` of merchant {merchant_name}! ⏳")
}

/// Reply to an integrator approving before the order system confirmed
#[must_use]
pub fn integrator_approve_error(deal_id: &str) -> String {
    format!("⚠️ Send the callback for deal `{deal_id}` first, then try again! 📋")
}

/// Notice of a rejection attempted after the deadline
#[must_use]
pub fn integrator_reject_late(deal_id: &str) -> String {
    format!("⚖️ The integrator tried to reject `{deal_id}` after the SLA expired! ⏳")
}

/// Tell the handler to finish a deal with no integrator chat
#[must_use]
pub fn handle_manually(deal_id: &str, integrator_name: &str) -> String {
    format!(
        "❌ Deal `{deal_id}` was not sent to an integrator (no chat for \"{integrator_name}\"). Handle it manually."
    )
}

/// Admin notice for a fuzzy integrator routing
#[must_use]
pub fn partial_integrator_match(deal_id: &str, api_name: &str, cascade_name: &str) -> String {
    format!(
        "⚠️ Partial integrator match for `{deal_id}`: {api_name} (order system) ~ {cascade_name} (registered)."
    )
}

/// Header of forwarded appeal proofs
#[must_use]
pub fn proofs_added(deal_id: &str) -> String {
    format!("🔍 Proofs for `{deal_id}`")
}

/// Acknowledgement of a callback request
#[must_use]
pub fn callback_requested(deal_id: &str) -> String {
    format!("⚡️ Requested a repeated success callback for deal `{deal_id}`")
}

/// Callback request for the integrator chat
#[must_use]
pub fn integrator_callback_request(deal_id: &str) -> String {
    format!("⚠️ Colleagues, please resend the callback for order `{deal_id}` a few times.")
}

/// Header of an integrator proof forwarded to the handler
#[must_use]
pub fn integrator_proof(deal_id: &str) -> String {
    format!("Integrator proof for deal `{deal_id}`")
}

/// Acknowledgement in the integrator chat
#[must_use]
pub fn integrator_proof_received(deal_id: &str) -> String {
    format!("Proofs for deal `{deal_id}` were taken into processing.")
}

/// Header of an accepted integrator proof in the merchant chat
#[must_use]
pub fn integrator_proof_sent(deal_id: &str) -> String {
    format!("Proofs attached for deal `{deal_id}`")
}

/// Shift start acknowledgement
#[must_use]
pub fn shift_started(time: &str) -> String {
    format!("🚗 Shift started at {time}! 🕒")
}

/// Operator error report
#[must_use]
pub fn error_report(error: &str) -> String {
    format!("⚠️ Error: {error}")
}

/// Daily statistics report.
///
/// # Arguments
/// * `date` - Desk-local date rendered in the header
/// * `user` - Display name of the user the stats belong to
/// * `stats` - Counters
/// * `pending` - Deal ids still awaiting an integrator
pub fn stats_report(
    date: &str,
    user: &str,
    stats: &DailyStats,
    pending: &[String],
) -> Result<String, std::fmt::Error> {
    let mut text = String::new();
    writeln!(text, "📈 Statistics for {date} 📊")?;
    writeln!(text, "👤 User: {user}")?;
    writeln!(text, "🆔 Taken: {}", stats.taken)?;
    writeln!(text, "✅ Approved: {}", stats.approved)?;
    writeln!(text, "✔️ Completed: {}", stats.completed)?;
    writeln!(text, "❌ Rejected: {}", stats.rejected)?;
    writeln!(text, "👁️ Viewed: {}", stats.viewed)?;
    writeln!(text, "⚠️ Errors: {}", stats.errors)?;
    writeln!(text, "🔄 Iterations: {}", stats.iterations())?;
    writeln!(text, "💬 Merchant messages: {}", stats.merchant_messages)?;
    writeln!(text, "🏪 Merchants: {}", stats.merchants.join(", "))?;
    writeln!(text)?;
    writeln!(text, "Awaiting integrator:")?;
    if pending.is_empty() {
        write!(text, "None")?;
    } else {
        for deal_id in pending {
            writeln!(text, "`{deal_id}`")?;
        }
    }
    Ok(text.trim_end().to_string())
}

/// Shift close report
#[must_use]
pub fn shift_stop_report(stats: &str, purged: u64, time: &str) -> String {
    format!("{stats}\n🗑️ Removed {purged} deals! ✅ Shift ended at {time}")
}

/// Help text listing every command
#[must_use]
pub fn help_text(admin_ids: &[String]) -> String {
    let admins = admin_ids
        .iter()
        .map(|id| format!("<@{id}>"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "📖 **DealDesk commands**\n\
        Deal routing bot. Staff only.\n\n\
        **Staff**\n\
        👋 `/start` - Greeting\n\
        📘 `/help` - This message\n\
        📋 `/merchant_list` - Claim or release merchants\n\
        🚗 `/shift_start` - Start a shift\n\
        🛑 `/shift_stop` - End the shift\n\
        📈 `/stats` - Today's statistics\n\
        📩 `/get_chats` - Bound chats\n\
        📋 `/list_cascades` - Integrators\n\
        ⚖️ `/appeal <deal_id> [manual]` - Open an appeal\n\n\
        **Admins**\n\
        🔗 `/link m|i <name> [chat_id]` - Bind a merchant or integrator chat\n\
        ➕ `/add_merchant <name> [handler]` - Add a merchant\n\
        ➖ `/delete_merchant <name>` - Delete a merchant\n\
        🔗 `/bind_merchant <name> [handler]` - Assign a handler\n\
        ➕ `/add_cascade <name>` - Add an integrator\n\
        ➖ `/delete_cascade <name>` - Delete an integrator\n\
        ✨ `/candles <name> <on|off>` - Require the integrator's order id\n\
        ➕ `/add_user <user>` - Add a staff member\n\
        ➖ `/remove_user <user>` - Remove a staff member\n\n\
        Admins: {admins}"
    )
}

/// Bound chats overview
#[must_use]
pub fn chat_list(merchants: &[merchant::Model], cascades: &[cascade::Model]) -> String {
    let chat = |chat_id: Option<&str>| chat_id.map_or_else(|| "unbound".to_string(), |id| format!("<#{id}>"));
    let lines: Vec<String> = merchants
        .iter()
        .map(|m| format!("Merchant: {} ({})", m.display_name, chat(m.chat_id.as_deref())))
        .chain(
            cascades
                .iter()
                .map(|c| format!("Integrator: {} ({})", c.display_name, chat(c.chat_id.as_deref()))),
        )
        .collect();

    if lines.is_empty() {
        "🏠 No chats!".to_string()
    } else {
        lines.join("\n")
    }
}

/// Cascade overview
#[must_use]
pub fn cascade_list(cascades: &[cascade::Model]) -> String {
    if cascades.is_empty() {
        return "📭 No integrators registered.".to_string();
    }
    let body = cascades
        .iter()
        .map(|c| {
            format!(
                "Name: {} | Chat: {} | External id: {}",
                c.name,
                c.chat_id.as_deref().unwrap_or("N/A"),
                if c.needs_external_id { "required" } else { "no" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n---->\n");
    format!("🤝 Integrators:\n---->\n{body}")
}

/// Approve / reject / view buttons for the handler
#[must_use]
pub fn handler_keyboard(deal_id: &str) -> Keyboard {
    let deal_id = deal_id.to_string();
    Keyboard::row(vec![
        Button::new(
            "✅ OK",
            Action::Approve {
                deal_id: deal_id.clone(),
            },
            ButtonStyle::Success,
        ),
        Button::new(
            "❌ Reject",
            Action::Reject {
                deal_id: deal_id.clone(),
            },
            ButtonStyle::Danger,
        ),
        Button::new("👁️ View", Action::View { deal_id }, ButtonStyle::Secondary),
    ])
}

/// Approve / reject buttons for the integrator
#[must_use]
pub fn integrator_keyboard(deal_id: &str) -> Keyboard {
    Keyboard::row(vec![
        Button::new(
            "✅ Accept",
            Action::IntegratorApprove {
                deal_id: deal_id.to_string(),
            },
            ButtonStyle::Success,
        ),
        Button::new(
            "❌ Reject",
            Action::IntegratorReject {
                deal_id: deal_id.to_string(),
            },
            ButtonStyle::Danger,
        ),
    ])
}

/// One button per rejection reason
#[must_use]
pub fn reason_keyboard(deal_id: &str) -> Keyboard {
    Keyboard::column(
        RejectReason::ALL
            .into_iter()
            .map(|reason| {
                Button::new(
                    reason.label(),
                    Action::Reason {
                        reason,
                        deal_id: deal_id.to_string(),
                    },
                    ButtonStyle::Secondary,
                )
            })
            .collect(),
    )
}

/// Accept / decline buttons under a forwarded integrator proof
#[must_use]
pub fn proof_keyboard(deal_id: &str) -> Keyboard {
    Keyboard::row(vec![
        Button::new(
            "✅ Accept",
            Action::ProofAccept {
                deal_id: deal_id.to_string(),
            },
            ButtonStyle::Success,
        ),
        Button::new(
            "❌ Decline",
            Action::ProofDecline {
                deal_id: deal_id.to_string(),
            },
            ButtonStyle::Danger,
        ),
    ])
}

/// Yes / no buttons for closing a shift
#[must_use]
pub fn shift_confirm_keyboard() -> Keyboard {
    Keyboard::row(vec![
        Button::new("✅ Yes", Action::ShiftStop { confirmed: true }, ButtonStyle::Success),
        Button::new("❌ No", Action::ShiftStop { confirmed: false }, ButtonStyle::Danger),
    ])
}

/// One toggle per merchant, ticked when held by `user_id`.
///
/// Discord allows at most 25 buttons per message; merchants beyond that are left out.
#[must_use]
pub fn merchant_keyboard(merchants: &[merchant::Model], user_id: &str) -> Keyboard {
    let buttons: Vec<Button> = merchants
        .iter()
        .take(25)
        .map(|m| {
            let held = m.handler_id.as_deref() == Some(user_id);
            Button::new(
                format!("{} {}", m.display_name, if held { "✅" } else { "❌" }),
                Action::ToggleMerchant {
                    name: m.name.clone(),
                },
                if held {
                    ButtonStyle::Success
                } else {
                    ButtonStyle::Secondary
                },
            )
        })
        .collect();

    Keyboard {
        rows: buttons.chunks(5).map(<[Button]>::to_vec).collect(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::config::SlaConfig;
    use crate::test_utils::test_order;

    #[test]
    fn test_deal_summary_lists_order_fields() {
        let policy = SlaPolicy::from_config(&SlaConfig::default()).unwrap();
        let mut order = test_order("a1b2c3d4-e5f6-7890-abcd-1234567890ab", "Acme");
        order.external_order_id = Some("991".to_string());

        let text = deal_summary(&order, None, &policy).unwrap();
        assert!(text.starts_with("🆔 Deal: `a1b2c3d4-e5f6-7890-abcd-1234567890ab`"));
        assert!(text.contains("🤝 Integrator: Acme"));
        assert!(text.contains("📊 Status: processing"));
        assert!(!text.contains("`991`"));
    }

    #[test]
    fn test_deal_summary_external_id_follows_cascade_flag() {
        let policy = SlaPolicy::from_config(&SlaConfig::default()).unwrap();
        let mut order = test_order("a1b2c3d4-e5f6-7890-abcd-1234567890ab", "Acme");
        order.external_order_id = Some("EXT-777".to_string());
        let mut acme = cascade::Model {
            id: 1,
            name: "Acme".to_string(),
            display_name: "Acme".to_string(),
            chat_id: Some("acme-chat".to_string()),
            needs_external_id: false,
        };

        let without = deal_summary(&order, Some(&acme), &policy).unwrap();
        assert!(!without.contains("EXT-777"));

        acme.needs_external_id = true;
        let with = deal_summary(&order, Some(&acme), &policy).unwrap();
        assert!(with.contains("🔗 Integrator order id: `EXT-777`"));

        order.external_order_id = None;
        let missing = deal_summary(&order, Some(&acme), &policy).unwrap();
        assert!(!missing.contains("Integrator order id"));
    }

    #[test]
    fn test_stats_report_lists_pending_deals() {
        let stats = DailyStats {
            completed: 2,
            rejected: 1,
            merchants: vec!["shop".to_string(), "mall".to_string()],
            ..DailyStats::default()
        };
        let text = stats_report("2026-10-18", "alice", &stats, &["d1".to_string()]).unwrap();
        assert!(text.contains("🔄 Iterations: 3"));
        assert!(text.contains("🏪 Merchants: shop, mall"));
        assert!(text.ends_with("`d1`"));

        let empty = stats_report("2026-10-18", "alice", &DailyStats::default(), &[]).unwrap();
        assert!(empty.ends_with("None"));
    }

    #[test]
    fn test_reason_keyboard_covers_every_reason() {
        let keyboard = reason_keyboard("d1");
        assert_eq!(keyboard.rows.len(), RejectReason::ALL.len());
        assert!(keyboard.actions().all(|action| action.deal_id() == Some("d1")));
    }

    #[test]
    fn test_merchant_keyboard_marks_held_merchants() {
        let merchants: Vec<merchant::Model> = (0..7)
            .map(|i| merchant::Model {
                id: i,
                name: format!("m{i}"),
                display_name: format!("M{i}"),
                chat_id: None,
                merchant_id: format!("id{i}"),
                handler_id: (i == 0).then(|| "alice".to_string()),
            })
            .collect();

        let keyboard = merchant_keyboard(&merchants, "alice");
        assert_eq!(keyboard.rows.len(), 2);
        assert_eq!(keyboard.rows[0][0].label, "M0 ✅");
        assert_eq!(keyboard.rows[0][1].label, "M1 ❌");
    }
}
