// Keys contract abstraction - balance reads and sell orders
// The native implementation talks to the chain through alloy; tests and dry
// runs plug in their own.

use crate::error::CoreError;
use crate::models::SellReceipt;
use async_trait::async_trait;
use log::info;
use std::sync::atomic::{AtomicU64, Ordering};

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, CoreError>;

/// Read side of the keys contract
#[async_trait]
pub trait SharesLedger: Send + Sync {
    /// Keys of `subject` held by `holder`
    async fn shares_balance(&self, subject: &str, holder: &str) -> LedgerResult<u64>;
}

/// Write side of the keys contract
#[async_trait]
pub trait SellExecutor: Send + Sync {
    /// Submit a sell of `amount` keys of `subject`. Returns once the
    /// transaction hash is known, without waiting for inclusion.
    async fn sell_shares(&self, subject: &str, amount: u64) -> LedgerResult<SellReceipt>;
}

/// Sell `amount` keys of `subject` held by `holder`, refusing to sell more
/// than the ledger says `holder` owns.
pub async fn sell_owned(
    ledger: &dyn SharesLedger,
    seller: &dyn SellExecutor,
    subject: &str,
    holder: &str,
    amount: u64,
) -> LedgerResult<SellReceipt> {
    if amount == 0 {
        return Err(CoreError::Validation("Sell amount must be > 0".to_string()));
    }
    let owned = ledger.shares_balance(subject, holder).await?;
    if amount > owned {
        return Err(CoreError::Validation(format!(
            "{} owns {} keys of {}, cannot sell {}",
            holder, owned, subject, amount
        )));
    }
    seller.sell_shares(subject, amount).await
}

/// Seller that only logs what it would have done.
#[derive(Debug, Default)]
pub struct DryRunSeller {
    counter: AtomicU64,
}

impl DryRunSeller {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SellExecutor for DryRunSeller {
    async fn sell_shares(&self, subject: &str, amount: u64) -> LedgerResult<SellReceipt> {
        if amount == 0 {
            return Err(CoreError::Validation("Sell amount must be > 0".to_string()));
        }
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let transaction_hash = format!("dry-run-{}", n);
        info!("[DRY RUN] would sell {} keys of {} ({})", amount, subject, transaction_hash);

        Ok(SellReceipt {
            subject: subject.to_string(),
            amount,
            transaction_hash,
            timestamp: chrono::Utc::now().timestamp(),
        })
    }
}
