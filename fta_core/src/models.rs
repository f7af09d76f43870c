use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decoded `Trade` event of the keys contract.
///
/// Addresses are kept as hex strings so the policy layer stays independent of
/// the EVM client types. ETH amounts are already converted from wei.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub trader: String,
    pub subject: String,
    pub is_buy: bool,
    pub share_amount: u64,
    pub eth_amount: f64,
    pub protocol_eth_amount: f64,
    pub subject_eth_amount: f64,
    pub supply: u64,
}

impl TradeEvent {
    pub fn is_sell(&self) -> bool {
        !self.is_buy
    }
}

/// Balances read right after a sell event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    /// Keys of the trader held by the watched wallet
    pub i_own: u64,
    /// Keys of the watched wallet still held by the trader
    pub trader_holds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellReceipt {
    pub subject: String,
    pub amount: u64,
    pub transaction_hash: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Buy,
    UnrelatedSubject,
    Throttled,
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IgnoreReason::Buy => write!(f, "buy event"),
            IgnoreReason::UnrelatedSubject => write!(f, "unrelated subject"),
            IgnoreReason::Throttled => write!(f, "throttled"),
        }
    }
}

/// What the sell policy did with one trade event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyOutcome {
    Ignored(IgnoreReason),
    NoAction(PositionSnapshot),
    Sold {
        snapshot: PositionSnapshot,
        receipt: SellReceipt,
    },
}

/// Profile data cached per address for notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedProfile {
    pub address: String,
    pub twitter_username: Option<String>,
    pub twitter_name: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// Keys of another user held by a wallet, as reported by the platform API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyHolding {
    pub address: String,
    pub twitter_username: Option<String>,
    pub twitter_name: Option<String>,
    pub balance: u64,
    /// Milliseconds since the Unix epoch, 0 when unknown
    pub last_online: i64,
}
