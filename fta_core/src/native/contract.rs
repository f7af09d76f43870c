// Keys contract client over alloy: balance reads, sells, and the Trade log feed

use crate::error::CoreError;
use crate::ledger::{LedgerResult, SellExecutor, SharesLedger};
use crate::models::{SellReceipt, TradeEvent};
use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder, WsConnect};
use alloy::rpc::types::Filter;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, info, warn};
use rand::Rng;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc;

sol! {
    #[sol(rpc)]
    interface FriendtechSharesV1 {
        event Trade(
            address trader,
            address subject,
            bool isBuy,
            uint256 shareAmount,
            uint256 ethAmount,
            uint256 protocolEthAmount,
            uint256 subjectEthAmount,
            uint256 supply
        );

        function sharesBalance(address sharesSubject, address holder) external view returns (uint256);
        function sellShares(address sharesSubject, uint256 amount) external payable;
    }
}

pub fn parse_address(s: &str) -> Result<Address, CoreError> {
    Address::from_str(s.trim()).map_err(|e| CoreError::InvalidInput(format!("invalid address {:?}: {}", s, e)))
}

/// Checksummed address of the wallet behind `private_key`.
pub fn wallet_address_from_key(private_key: &str) -> Result<String, CoreError> {
    PrivateKeySigner::from_str(private_key)
        .map(|signer| signer.address().to_string())
        .map_err(|e| CoreError::Init(format!("Invalid private key: {}", e)))
}

fn u256_to_u64(value: U256, field: &str) -> Result<u64, CoreError> {
    u64::try_from(value).map_err(|_| CoreError::Conversion(format!("{} out of range: {}", field, value)))
}

fn wei_to_eth(value: U256) -> f64 {
    format_ether(value).parse().unwrap_or(f64::MAX)
}

/// Convert a decoded `Trade` log into the address-as-string model.
pub fn trade_event_from_log(trade: &FriendtechSharesV1::Trade) -> Result<TradeEvent, CoreError> {
    Ok(TradeEvent {
        trader: trade.trader.to_string(),
        subject: trade.subject.to_string(),
        is_buy: trade.isBuy,
        share_amount: u256_to_u64(trade.shareAmount, "shareAmount")?,
        eth_amount: wei_to_eth(trade.ethAmount),
        protocol_eth_amount: wei_to_eth(trade.protocolEthAmount),
        subject_eth_amount: wei_to_eth(trade.subjectEthAmount),
        supply: u256_to_u64(trade.supply, "supply")?,
    })
}

/// Reader and (when a key is configured) seller for the keys contract
pub struct FriendTechContract {
    address: Address,
    provider: DynProvider,
    wallet: Option<Address>,
}

impl FriendTechContract {
    /// Connect with a signing wallet so `sell_shares` can submit transactions.
    pub async fn connect(node_url: &str, contract_address: &str, private_key: &str) -> Result<Self, CoreError> {
        let address = parse_address(contract_address)?;
        let signer = PrivateKeySigner::from_str(private_key)
            .map_err(|e| CoreError::Init(format!("Invalid private key: {}", e)))?;
        let wallet = signer.address();

        let provider = ProviderBuilder::new()
            .wallet(signer)
            .connect(node_url)
            .await
            .map_err(|e| CoreError::Rpc(format!("Failed to connect to node: {}", e)))?
            .erased();

        info!("Connected to keys contract {} as {}", address, wallet);
        Ok(Self {
            address,
            provider,
            wallet: Some(wallet),
        })
    }

    /// Connect without a wallet. Sells fail with a transaction error.
    pub async fn connect_read_only(node_url: &str, contract_address: &str) -> Result<Self, CoreError> {
        let address = parse_address(contract_address)?;
        let provider = ProviderBuilder::new()
            .connect(node_url)
            .await
            .map_err(|e| CoreError::Rpc(format!("Failed to connect to node: {}", e)))?
            .erased();

        info!("Connected to keys contract {} (read-only)", address);
        Ok(Self {
            address,
            provider,
            wallet: None,
        })
    }
}

#[async_trait]
impl SharesLedger for FriendTechContract {
    async fn shares_balance(&self, subject: &str, holder: &str) -> LedgerResult<u64> {
        let contract = FriendtechSharesV1::new(self.address, self.provider.clone());
        let balance = contract
            .sharesBalance(parse_address(subject)?, parse_address(holder)?)
            .call()
            .await
            .map_err(|e| CoreError::Rpc(format!("sharesBalance({}, {}) failed: {}", subject, holder, e)))?;

        let balance = u256_to_u64(balance, "sharesBalance")?;
        debug!("sharesBalance({}, {}) = {}", subject, holder, balance);
        Ok(balance)
    }
}

#[async_trait]
impl SellExecutor for FriendTechContract {
    async fn sell_shares(&self, subject: &str, amount: u64) -> LedgerResult<SellReceipt> {
        if self.wallet.is_none() {
            return Err(CoreError::Transaction("Missing private key".to_string()));
        }
        if amount == 0 {
            return Err(CoreError::Validation("Sell amount must be > 0".to_string()));
        }

        let contract = FriendtechSharesV1::new(self.address, self.provider.clone());
        let pending = contract
            .sellShares(parse_address(subject)?, U256::from(amount))
            .send()
            .await
            .map_err(|e| CoreError::Transaction(format!("sellShares({}, {}) failed: {}", subject, amount, e)))?;

        Ok(SellReceipt {
            subject: subject.to_string(),
            amount,
            transaction_hash: pending.tx_hash().to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        })
    }
}

/// Random delay in `[base / 2, base * 3 / 2]`.
pub fn jittered_delay(base: Duration) -> Duration {
    let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
    if base_ms == 0 {
        return Duration::ZERO;
    }
    let high = base_ms.saturating_add(base_ms / 2);
    let ms = rand::thread_rng().gen_range(base_ms / 2..=high);
    Duration::from_millis(ms)
}

/// Streams `Trade` logs of the keys contract into a channel, reconnecting
/// after every dropped subscription.
pub struct FriendTechEventSource {
    node_ws_url: String,
    contract_address: Address,
    reconnect_delay: Duration,
}

enum SessionEnd {
    StreamEnded,
    ReceiverClosed,
}

impl FriendTechEventSource {
    pub fn new(node_ws_url: &str, contract_address: &str, reconnect_delay: Duration) -> Result<Self, CoreError> {
        Ok(Self {
            node_ws_url: node_ws_url.to_string(),
            contract_address: parse_address(contract_address)?,
            reconnect_delay,
        })
    }

    /// Run until `sender`'s receiver is dropped.
    pub async fn run(&self, sender: mpsc::Sender<TradeEvent>) -> Result<(), CoreError> {
        loop {
            match self.run_session(&sender).await {
                Ok(SessionEnd::ReceiverClosed) => break,
                Ok(SessionEnd::StreamEnded) => warn!("Trade subscription ended"),
                Err(e) => warn!("Trade subscription failed: {}", e),
            }
            if sender.is_closed() {
                break;
            }

            let delay = jittered_delay(self.reconnect_delay);
            info!("Reconnecting to {} in {:?}", self.node_ws_url, delay);
            tokio::time::sleep(delay).await;
        }

        info!("Trade event source stopped");
        Ok(())
    }

    async fn run_session(&self, sender: &mpsc::Sender<TradeEvent>) -> Result<SessionEnd, CoreError> {
        let provider = ProviderBuilder::new()
            .connect_ws(WsConnect::new(self.node_ws_url.clone()))
            .await
            .map_err(|e| CoreError::Rpc(format!("WebSocket connect failed: {}", e)))?;

        let filter = Filter::new()
            .address(self.contract_address)
            .event_signature(FriendtechSharesV1::Trade::SIGNATURE_HASH);
        let subscription = provider
            .subscribe_logs(&filter)
            .await
            .map_err(|e| CoreError::Rpc(format!("subscribe_logs failed: {}", e)))?;
        let mut stream = subscription.into_stream();
        info!("Subscribed to Trade events of {}", self.contract_address);

        while let Some(log) = stream.next().await {
            let event = match log
                .log_decode::<FriendtechSharesV1::Trade>()
                .map_err(|e| CoreError::ParseError(e.to_string()))
                .and_then(|decoded| trade_event_from_log(&decoded.inner.data))
            {
                Ok(event) => event,
                Err(e) => {
                    warn!("Skipping undecodable Trade log: {}", e);
                    continue;
                }
            };

            if sender.send(event).await.is_err() {
                return Ok(SessionEnd::ReceiverClosed);
            }
        }

        Ok(SessionEnd::StreamEnded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    fn trade(share_amount: u64, eth_wei: u128) -> FriendtechSharesV1::Trade {
        FriendtechSharesV1::Trade {
            trader: address!("0x1111111111111111111111111111111111111111"),
            subject: address!("0x2222222222222222222222222222222222222222"),
            isBuy: false,
            shareAmount: U256::from(share_amount),
            ethAmount: U256::from(eth_wei),
            protocolEthAmount: U256::from(eth_wei / 20),
            subjectEthAmount: U256::from(eth_wei / 20),
            supply: U256::from(42u64),
        }
    }

    #[test]
    fn decodes_trade_into_model() {
        let event = trade_event_from_log(&trade(3, 1_500_000_000_000_000_000)).unwrap();

        assert!(event.is_sell());
        assert!(event.trader.eq_ignore_ascii_case("0x1111111111111111111111111111111111111111"));
        assert_eq!(event.share_amount, 3);
        assert_eq!(event.supply, 42);
        assert!((event.eth_amount - 1.5).abs() < 1e-12);
        assert!((event.protocol_eth_amount - 0.075).abs() < 1e-12);
    }

    #[test]
    fn rejects_share_amounts_beyond_u64() {
        let mut t = trade(1, 0);
        t.shareAmount = U256::from(u64::MAX) + U256::from(1u64);
        assert!(matches!(trade_event_from_log(&t), Err(CoreError::Conversion(_))));
    }

    #[test]
    fn parses_addresses() {
        assert!(parse_address(crate::settings::FRIEND_TECH_BASE_CONTRACT_ADDRESS).is_ok());
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("not an address").is_err());
    }

    #[test]
    fn derives_wallet_address() {
        // Well-known first dev account of anvil/hardhat
        let key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        assert_eq!(
            wallet_address_from_key(key).unwrap(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
        assert!(wallet_address_from_key("0x1234").is_err());
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let base = Duration::from_secs(10);
        for _ in 0..200 {
            let d = jittered_delay(base);
            assert!(d >= Duration::from_secs(5) && d <= Duration::from_secs(15));
        }
        assert_eq!(jittered_delay(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn jitter_saturates_for_huge_delays() {
        let d = jittered_delay(Duration::from_secs(u64::MAX));
        assert!(d >= Duration::from_millis(u64::MAX / 2));
    }

    fn unreachable_source() -> FriendTechEventSource {
        FriendTechEventSource::new(
            "ws://127.0.0.1:1",
            crate::settings::FRIEND_TECH_BASE_CONTRACT_ADDRESS,
            Duration::from_millis(20),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn stops_once_receiver_is_closed() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let result = tokio::time::timeout(Duration::from_secs(10), unreachable_source().run(tx)).await;
        assert!(matches!(result, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn keeps_reconnecting_after_failed_sessions() {
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(async move { unreachable_source().run(tx).await });

        // Every session fails immediately; the source must stay in its retry loop
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!handle.is_finished());

        drop(rx);
        let result = tokio::time::timeout(Duration::from_secs(10), handle).await;
        assert!(matches!(result, Ok(Ok(Ok(())))));
    }
}
