use crate::models::{PolicyOutcome, TradeEvent};
use crate::sell_policy::TradeEventPolicy;
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Counters for everything the dispatcher saw before its channel closed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub received: u64,
    pub ignored: u64,
    pub no_action: u64,
    pub sold: u64,
    pub failed: u64,
}

/// Feeds trade events to the policy strictly one at a time, in arrival order.
pub struct TradeDispatcher {
    receiver: mpsc::Receiver<TradeEvent>,
    policy: Arc<TradeEventPolicy>,
}

impl TradeDispatcher {
    pub fn new(receiver: mpsc::Receiver<TradeEvent>, policy: Arc<TradeEventPolicy>) -> Self {
        Self { receiver, policy }
    }

    /// Run until every sender is dropped.
    pub async fn run(mut self) -> DispatchStats {
        let mut stats = DispatchStats::default();

        while let Some(event) = self.receiver.recv().await {
            stats.received += 1;
            match self.policy.handle(&event).await {
                Ok(PolicyOutcome::Ignored(reason)) => {
                    debug!("Ignored trade by {}: {}", event.trader, reason);
                    stats.ignored += 1;
                }
                Ok(PolicyOutcome::NoAction(_)) => stats.no_action += 1,
                Ok(PolicyOutcome::Sold { receipt, .. }) => {
                    debug!("Sell submitted: {}", receipt.transaction_hash);
                    stats.sold += 1;
                }
                Err(e) if e.is_retryable() => {
                    warn!("Transient failure on sell event from {}: {}", event.trader, e);
                    stats.failed += 1;
                }
                Err(e) => {
                    error!("Failed to handle sell event from {}: {}", event.trader, e);
                    stats.failed += 1;
                }
            }
        }

        info!(
            "Trade dispatcher stopped: {} received, {} sold, {} failed",
            stats.received, stats.sold, stats.failed
        );
        stats
    }
}
