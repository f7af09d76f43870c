// FTA Core Library
// Keys sell allocation and the trade event policy around it

pub mod allocation;
pub mod error;
pub mod format;
pub mod holdings;
pub mod ledger;
pub mod models;
pub mod notifier;
pub mod profiles;
pub mod settings;
pub mod storage_trait;

pub mod dispatcher;
pub mod sell_policy;

#[cfg(feature = "native")]
pub mod native;

// Re-exports
pub use allocation::{checked_sell_amount, compute_sell_amount, parse_quantity};
pub use dispatcher::{DispatchStats, TradeDispatcher};
pub use error::{CoreError, CoreResult};
pub use holdings::filter_holdings;
pub use ledger::*;
pub use models::*;
pub use notifier::{LogNotifier, Notifier};
pub use profiles::{CachedProfileLookup, ProfileLookup};
pub use sell_policy::{PolicyConfig, TradeEventPolicy};
pub use settings::Settings;
pub use storage_trait::*;
