// friend.tech REST client for trader profiles

use crate::error::CoreError;
use crate::models::{CachedProfile, KeyHolding};
use crate::profiles::{ProfileLookup, ProfileResult};
use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

const USER_AGENT: &str = concat!("fta/", env!("CARGO_PKG_VERSION"));

/// Subset of the `/users/{address}` response the notifications need
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserResponse {
    address: String,
    twitter_username: Option<String>,
    twitter_name: Option<String>,
}

impl From<UserResponse> for CachedProfile {
    fn from(user: UserResponse) -> Self {
        CachedProfile {
            address: user.address,
            twitter_username: user.twitter_username.filter(|s| !s.is_empty()),
            twitter_name: user.twitter_name.filter(|s| !s.is_empty()),
            fetched_at: Utc::now(),
        }
    }
}

/// One page of `/users/{address}/token-holdings`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HoldingsPage {
    next_page_start: Option<u64>,
    users: Vec<HoldingResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HoldingResponse {
    address: String,
    twitter_username: Option<String>,
    twitter_name: Option<String>,
    /// Sent as a decimal string
    balance: String,
    #[serde(default)]
    last_online: Option<i64>,
}

impl TryFrom<HoldingResponse> for KeyHolding {
    type Error = CoreError;

    fn try_from(holding: HoldingResponse) -> Result<Self, Self::Error> {
        let balance = holding.balance.trim().parse::<u64>().map_err(|e| {
            CoreError::ParseError(format!("Bad balance '{}' for {}: {}", holding.balance, holding.address, e))
        })?;
        Ok(KeyHolding {
            address: holding.address,
            twitter_username: holding.twitter_username.filter(|s| !s.is_empty()),
            twitter_name: holding.twitter_name.filter(|s| !s.is_empty()),
            balance,
            last_online: holding.last_online.unwrap_or(0),
        })
    }
}

pub struct FriendTechApi {
    client: Client,
    base_url: String,
}

impl FriendTechApi {
    pub fn new(base_url: &str) -> Result<Self, CoreError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CoreError::Init(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn user_url(&self, address: &str) -> String {
        format!("{}/users/{}", self.base_url, address)
    }

    fn holdings_url(&self, address: &str, page_start: u64) -> String {
        format!("{}/users/{}/token-holdings?pageStart={}", self.base_url, address, page_start)
    }

    /// Every key position `address` holds, following pagination to the end.
    pub async fn token_holdings(&self, address: &str) -> Result<Vec<KeyHolding>, CoreError> {
        let mut holdings = Vec::new();
        let mut page_start = 0;

        loop {
            let url = self.holdings_url(address, page_start);
            debug!("Fetching URL: {}", url);

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| CoreError::Rpc(format!("HTTP request failed: {}", e)))?;
            if !response.status().is_success() {
                return Err(CoreError::Rpc(format!("GET {} returned {}", url, response.status())));
            }
            let body = response
                .text()
                .await
                .map_err(|e| CoreError::Rpc(format!("Failed to read response body: {}", e)))?;

            let page: HoldingsPage = serde_json::from_str(&body)?;
            for holding in page.users {
                holdings.push(KeyHolding::try_from(holding)?);
            }

            match page.next_page_start {
                Some(next) if next > page_start => page_start = next,
                _ => break,
            }
        }

        Ok(holdings)
    }
}

#[async_trait]
impl ProfileLookup for FriendTechApi {
    async fn profile(&self, address: &str) -> ProfileResult<Option<CachedProfile>> {
        let url = self.user_url(address);
        debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CoreError::Rpc(format!("HTTP request failed: {}", e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response
                    .text()
                    .await
                    .map_err(|e| CoreError::Rpc(format!("Failed to read response body: {}", e)))?;
                let user: UserResponse = serde_json::from_str(&body)?;
                Ok(Some(user.into()))
            }
            status => Err(CoreError::Rpc(format!("GET {} returned {}", url, status))),
        }
    }
}
