use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[cfg(feature = "native")]
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialization(String),

    #[error("Initialization error: {0}")]
    Init(String),

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Transient failures worth retrying on the next event or reconnect.
    /// Everything else (bad input, bad config, reverted transactions) is fatal
    /// for the operation that produced it.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::Rpc(_) | CoreError::Notification(_) | CoreError::Io(_)
        )
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Io(err.to_string())
    }
}

#[cfg(feature = "native")]
impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CoreError {
    fn from(err: toml::ser::Error) -> Self {
        CoreError::TomlSerialization(err.to_string())
    }
}

#[cfg(feature = "native")]
impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        CoreError::Rpc(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(CoreError::Rpc("timeout".into()).is_retryable());
        assert!(CoreError::Notification("429".into()).is_retryable());
        assert!(!CoreError::InvalidInput("-1".into()).is_retryable());
        assert!(!CoreError::Transaction("reverted".into()).is_retryable());
    }

    #[test]
    fn io_errors_convert() {
        let err: CoreError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, CoreError::Io(ref m) if m.contains("gone")));
    }
}
