// Telegram Bot API notifier using reqwest

use crate::error::CoreError;
use crate::notifier::{Notifier, NotifierResult};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
}

pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    api_key: String,
    user_id: i64,
}

impl TelegramNotifier {
    pub fn new(api_url: &str, api_key: &str, user_id: i64) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            user_id,
        }
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.api_key)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> NotifierResult<()> {
        let body = SendMessage {
            chat_id: self.user_id,
            text: message,
            parse_mode: "MarkdownV2",
        };

        let response = self
            .client
            .post(self.send_message_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::Notification(format!("sendMessage request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CoreError::Notification(format!("sendMessage returned {}: {}", status, text)));
        }

        debug!("Telegram message delivered to {}", self.user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_send_message_url() {
        let notifier = TelegramNotifier::new("https://api.telegram.org/", "123:abc", 42);
        assert_eq!(notifier.send_message_url(), "https://api.telegram.org/bot123:abc/sendMessage");
    }

    #[test]
    fn serializes_markdown_payload() {
        let body = SendMessage {
            chat_id: 42,
            text: "hi\\.",
            parse_mode: "MarkdownV2",
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"chat_id": 42, "text": "hi\\.", "parse_mode": "MarkdownV2"})
        );
    }

    #[tokio::test]
    async fn unreachable_api_is_a_notification_error() {
        let notifier = TelegramNotifier::new("http://127.0.0.1:1", "key", 1);
        let err = notifier.send("hello").await.unwrap_err();
        assert!(matches!(err, CoreError::Notification(_)));
    }
}
