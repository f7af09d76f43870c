use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// friend.tech keys contract on Base.
pub const FRIEND_TECH_BASE_CONTRACT_ADDRESS: &str = "0xCF205808Ed36593aa40a44F10c7f7C2F67d4A4d4";

/// Environment variable that can hold the wallet private key instead of the config file.
pub const PRIVATE_KEY_ENV_VAR: &str = "FTA_PRIVATE_KEY";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub node_ws_url: String,
    #[serde(default = "default_contract_address")]
    pub contract_address: String,
    /// Wallet whose keys are watched. Defaults to the wallet derived from the private key.
    #[serde(default)]
    pub watched_address: Option<String>,
    #[serde(default)]
    pub wallet_private_key: Option<String>,
    #[serde(default)]
    pub telegram_api_key: Option<String>,
    #[serde(default)]
    pub telegram_user_id: Option<i64>,
    #[serde(default = "default_telegram_api_url")]
    pub telegram_api_url: String,
    #[serde(default = "default_profile_api_url")]
    pub profile_api_url: String,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
    /// React to sells of any subject and throttle events locally
    #[serde(default)]
    pub dev_mode: bool,
    #[serde(default = "default_throttle_secs")]
    pub throttle_secs: u64,
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
    #[serde(default = "default_health_port")]
    pub health_port: u16,
}

impl Settings {
    /// Load settings from a TOML file, with `FTA_*` environment variables taking precedence.
    #[cfg(feature = "native")]
    pub fn from_file(path: &str) -> Result<Self, CoreError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("FTA").try_parsing(true));
        let cfg = builder.build()?;
        Ok(cfg.try_deserialize()?)
    }

    /// Render the settings as TOML. Secrets are masked unless `include_secrets` is set.
    pub fn to_toml_string(&self, include_secrets: bool) -> Result<String, CoreError> {
        if include_secrets {
            return Ok(toml::to_string(self)?);
        }
        let mut masked = self.clone();
        masked.wallet_private_key = masked.wallet_private_key.as_deref().map(mask_secret);
        masked.telegram_api_key = masked.telegram_api_key.as_deref().map(mask_secret);
        Ok(toml::to_string(&masked)?)
    }

    /// Validate settings ranges and constraints
    pub fn validate(&self) -> Result<(), CoreError> {
        let ws_url = url::Url::parse(&self.node_ws_url)
            .map_err(|e| CoreError::Validation(format!("node_ws_url is not a valid URL: {}", e)))?;
        if !matches!(ws_url.scheme(), "ws" | "wss") {
            return Err(CoreError::Validation(format!(
                "node_ws_url must use ws:// or wss://, got {}://",
                ws_url.scheme()
            )));
        }
        url::Url::parse(&self.profile_api_url)
            .map_err(|e| CoreError::Validation(format!("profile_api_url is not a valid URL: {}", e)))?;
        url::Url::parse(&self.telegram_api_url)
            .map_err(|e| CoreError::Validation(format!("telegram_api_url is not a valid URL: {}", e)))?;

        if !is_hex_address(&self.contract_address) {
            return Err(CoreError::Validation("contract_address must be a 0x-prefixed 20-byte hex address".to_string()));
        }
        if let Some(watched) = &self.watched_address {
            if !is_hex_address(watched) {
                return Err(CoreError::Validation("watched_address must be a 0x-prefixed 20-byte hex address".to_string()));
            }
        }
        if let Some(key) = &self.wallet_private_key {
            parse_private_key_string(key).map_err(CoreError::Validation)?;
        }
        if self.throttle_secs == 0 {
            return Err(CoreError::Validation("throttle_secs must be > 0".to_string()));
        }
        if self.reconnect_delay_secs == 0 {
            return Err(CoreError::Validation("reconnect_delay_secs must be > 0".to_string()));
        }
        if self.event_channel_capacity == 0 {
            return Err(CoreError::Validation("event_channel_capacity must be > 0".to_string()));
        }
        if self.telegram_user_id.is_some() && self.telegram_api_key.is_none() {
            return Err(CoreError::Validation("telegram_user_id requires telegram_api_key".to_string()));
        }
        Ok(())
    }

    /// Private key from `FTA_PRIVATE_KEY`, falling back to `wallet_private_key`.
    #[cfg(feature = "native")]
    pub fn resolve_private_key(&self) -> Result<Option<String>, CoreError> {
        match load_private_key_from_env_var(PRIVATE_KEY_ENV_VAR) {
            Some(key) => Ok(Some(key)),
            None => self
                .wallet_private_key
                .as_deref()
                .map(parse_private_key_string)
                .transpose()
                .map_err(CoreError::InvalidInput),
        }
    }
}

/// Read a hex private key from the given env var. Returns the normalized key
/// if present and valid, otherwise None.
#[cfg(feature = "native")]
pub fn load_private_key_from_env_var(var: &str) -> Option<String> {
    let raw = std::env::var(var).ok()?;
    match parse_private_key_string(&raw) {
        Ok(key) => Some(key),
        Err(e) => {
            log::warn!("Ignoring {}: {}", var, e);
            None
        }
    }
}

/// Normalize a hex private key: optional `0x` prefix, exactly 64 hex digits.
pub fn parse_private_key_string(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    let hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    if hex.len() != 64 {
        return Err(format!("private key must be 64 hex characters, got {}", hex.len()));
    }
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err("private key contains non-hex characters".to_string());
    }

    Ok(format!("0x{}", hex.to_ascii_lowercase()))
}

pub fn is_hex_address(s: &str) -> bool {
    s.strip_prefix("0x")
        .map(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

fn mask_secret(secret: &str) -> String {
    let tail: String = secret.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("****{}", tail)
}

fn default_contract_address() -> String { FRIEND_TECH_BASE_CONTRACT_ADDRESS.to_string() }
fn default_telegram_api_url() -> String { "https://api.telegram.org".to_string() }
fn default_profile_api_url() -> String { "https://prod-api.kosetto.com".to_string() }
fn default_cache_dir() -> String { ".fta".to_string() }
fn default_throttle_secs() -> u64 { 30 }
fn default_reconnect_delay_secs() -> u64 { 10 }
fn default_event_channel_capacity() -> usize { 100 }
fn default_health_port() -> u16 { 6969 }

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_settings() -> Settings {
        serde_json::from_str(r#"{ "node_ws_url": "wss://base-mainnet.example.com/ws" }"#).unwrap()
    }

    #[test]
    fn defaults_are_applied() {
        let s = minimal_settings();
        assert_eq!(s.contract_address, FRIEND_TECH_BASE_CONTRACT_ADDRESS);
        assert_eq!(s.throttle_secs, 30);
        assert_eq!(s.health_port, 6969);
        assert!(!s.dev_mode);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn load_example_config() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../config.example.toml");
        let s = Settings::from_file(path).unwrap();
        assert_eq!(s.contract_address, FRIEND_TECH_BASE_CONTRACT_ADDRESS);
        assert_eq!(s.event_channel_capacity, 100);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn rejects_http_node_url() {
        let mut s = minimal_settings();
        s.node_ws_url = "https://base-mainnet.example.com".to_string();
        assert!(matches!(s.validate(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn rejects_bad_watched_address() {
        let mut s = minimal_settings();
        s.watched_address = Some("0x1234".to_string());
        assert!(s.validate().is_err());
    }

    #[test]
    fn telegram_user_requires_api_key() {
        let mut s = minimal_settings();
        s.telegram_user_id = Some(42);
        assert!(s.validate().is_err());
        s.telegram_api_key = Some("123:abc".to_string());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn private_key_parsing() {
        let key = "AB".repeat(32);
        assert_eq!(parse_private_key_string(&key).unwrap(), format!("0x{}", "ab".repeat(32)));
        assert_eq!(parse_private_key_string(&format!("0x{}", key)).unwrap(), format!("0x{}", "ab".repeat(32)));
        assert!(parse_private_key_string("0x1234").is_err());
        assert!(parse_private_key_string(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn secrets_are_masked() {
        let mut s = minimal_settings();
        s.wallet_private_key = Some(format!("0x{}", "1".repeat(60) + "abcd"));
        s.telegram_api_key = Some("123:secret".to_string());

        let masked = s.to_toml_string(false).unwrap();
        assert!(masked.contains("****abcd"));
        assert!(masked.contains("****cret"));
        assert!(!masked.contains("123:secret"));

        let full = s.to_toml_string(true).unwrap();
        assert!(full.contains("123:secret"));
    }
}
