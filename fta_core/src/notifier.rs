// Notification sink and the messages the sell policy emits

use crate::error::CoreError;
use crate::format::{escape_markdown, pluralize, round_eth};
use crate::models::{PositionSnapshot, TradeEvent};
use async_trait::async_trait;
use log::info;

pub type NotifierResult<T> = Result<T, CoreError>;

/// Fire-and-forget message sink. Callers log failures instead of propagating them.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a MarkdownV2-formatted message
    async fn send(&self, message: &str) -> NotifierResult<()>;
}

/// Notifier used when no chat is configured: messages only reach the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> NotifierResult<()> {
        info!("notification: {}", message);
        Ok(())
    }
}

pub fn room_url(address: &str) -> String {
    format!("https://friend.tech/rooms/{}", address)
}

/// First message for a sell event: who sold, balances, and the decision.
pub fn sell_observed_message(
    event: &TradeEvent,
    trader_name: Option<&str>,
    snapshot: &PositionSnapshot,
    to_sell: u64,
) -> String {
    let name = escape_markdown(trader_name.unwrap_or("⚠️ Unknown user"));
    let url = escape_markdown(&room_url(&event.trader));
    let price = escape_markdown(&format!("{} ETH", round_eth(event.eth_amount, 4)));
    let decision = if to_sell > 0 {
        format!("Trying to sell {} {}", to_sell, pluralize("key", to_sell))
    } else {
        "No need to sell".to_string()
    };

    format!(
        "🚨 [{}]({}) sold *{} {}* for *{}*\\. I own {}, trader holds {} of my keys\\. {}",
        name,
        url,
        event.share_amount,
        pluralize("key", event.share_amount),
        price,
        snapshot.i_own,
        snapshot.trader_holds,
        decision
    )
}

/// Second message, after the sell transaction was submitted.
pub fn sold_message(subject: &str, sold: u64, own_after_sell: u64) -> String {
    let mut message = format!(
        "✅ Sold *{} {}* of {}",
        sold,
        pluralize("key", sold),
        escape_markdown(subject)
    );

    if own_after_sell > 0 {
        message.push_str(&format!(
            ", you still own *{} {}*",
            own_after_sell,
            pluralize("key", own_after_sell)
        ));
    } else {
        message.push_str(", you don’t own any keys of this user anymore");
    }

    message
}
