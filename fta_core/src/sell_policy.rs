// Reaction to a single trade event: filter, read balances, decide, sell, notify
// Collaborators are injected as trait objects so the same policy drives live,
// dry-run and test setups.

use crate::allocation::compute_sell_amount;
use crate::error::CoreError;
use crate::format::{compare_hashes, shorten_hash};
use crate::ledger::{SellExecutor, SharesLedger};
use crate::models::{IgnoreReason, PolicyOutcome, PositionSnapshot, TradeEvent};
use crate::notifier::{sell_observed_message, sold_message, Notifier};
use crate::profiles::ProfileLookup;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub type PolicyResult<T> = Result<T, CoreError>;

#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// Wallet whose keys are watched; sells of other subjects are ignored
    pub watched_address: String,
    /// Accept sells of any subject and throttle locally
    pub dev_mode: bool,
    pub throttle: Duration,
}

#[derive(Debug, Clone, Copy)]
enum Throttle {
    Open,
    Until(Instant),
    /// The window end is past what `Instant` can represent
    Forever,
}

pub struct TradeEventPolicy {
    config: PolicyConfig,
    ledger: Arc<dyn SharesLedger>,
    seller: Arc<dyn SellExecutor>,
    notifier: Arc<dyn Notifier>,
    profiles: Option<Arc<dyn ProfileLookup>>,
    throttle: Mutex<Throttle>,
}

impl TradeEventPolicy {
    pub fn new(
        config: PolicyConfig,
        ledger: Arc<dyn SharesLedger>,
        seller: Arc<dyn SellExecutor>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            ledger,
            seller,
            notifier,
            profiles: None,
            throttle: Mutex::new(Throttle::Open),
        }
    }

    /// Resolve trader names for notifications through `profiles`.
    pub fn with_profiles(mut self, profiles: Arc<dyn ProfileLookup>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub async fn handle(&self, event: &TradeEvent) -> PolicyResult<PolicyOutcome> {
        if !event.is_sell() {
            return Ok(PolicyOutcome::Ignored(IgnoreReason::Buy));
        }

        if !self.config.dev_mode && !compare_hashes(&event.subject, &self.config.watched_address) {
            debug!("Skipping sell of unrelated subject {}", event.subject);
            return Ok(PolicyOutcome::Ignored(IgnoreReason::UnrelatedSubject));
        }

        let (trader_holds, i_own) = tokio::try_join!(
            self.ledger.shares_balance(&event.subject, &event.trader),
            self.ledger.shares_balance(&event.trader, &event.subject),
        )?;
        let snapshot = PositionSnapshot { i_own, trader_holds };

        if self.config.dev_mode && !self.try_acquire_throttle() {
            debug!("Throttled sell event from {}", event.trader);
            return Ok(PolicyOutcome::Ignored(IgnoreReason::Throttled));
        }

        let to_sell = compute_sell_amount(i_own, trader_holds, event.share_amount);
        info!(
            "{} sold {} keys: I own {}, trader holds {}, selling {}",
            event.trader, event.share_amount, i_own, trader_holds, to_sell
        );

        let trader_name = self.trader_name(&event.trader).await;
        self.notify(&sell_observed_message(event, trader_name.as_deref(), &snapshot, to_sell))
            .await;

        if to_sell == 0 {
            return Ok(PolicyOutcome::NoAction(snapshot));
        }

        let receipt = self.seller.sell_shares(&event.trader, to_sell).await?;
        info!(
            "Sold {} keys of {} (tx {})",
            receipt.amount,
            event.trader,
            shorten_hash(&receipt.transaction_hash)
        );

        self.notify(&sold_message(&event.trader, to_sell, i_own - to_sell)).await;

        Ok(PolicyOutcome::Sold { snapshot, receipt })
    }

    /// Opens the throttle window if it is not already open. Returns false while
    /// a previous event holds it.
    fn try_acquire_throttle(&self) -> bool {
        let now = Instant::now();
        let mut state = match self.throttle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match *state {
            Throttle::Forever => false,
            Throttle::Until(deadline) if now < deadline => false,
            _ => {
                *state = match now.checked_add(self.config.throttle) {
                    Some(deadline) => Throttle::Until(deadline),
                    None => Throttle::Forever,
                };
                true
            }
        }
    }

    async fn trader_name(&self, trader: &str) -> Option<String> {
        let profiles = self.profiles.as_ref()?;
        match profiles.display_name(trader).await {
            Ok(name) => name,
            Err(e) => {
                warn!("Profile lookup for {} failed: {}", trader, e);
                None
            }
        }
    }

    async fn notify(&self, message: &str) {
        if let Err(e) = self.notifier.send(message).await {
            warn!("Failed to send notification: {}", e);
        }
    }
}
