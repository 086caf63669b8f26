//! Telegram Bot API push client.
//!
//! The silent flag maps to `disable_notification`: the message still arrives,
//! without a sound. Used for losing results and pre-match notices.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: Client,
    base_url: String,
    chat_id: String,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_notification: bool,
}

impl TelegramClient {
    pub fn new(bot_token: &str, chat_id: String) -> Self {
        Self::with_base_url(format!("https://api.telegram.org/bot{bot_token}"), chat_id)
    }

    /// Test hook: point the client at a stub server.
    pub fn with_base_url(base_url: String, chat_id: String) -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url,
            chat_id,
        }
    }

    pub async fn send(&self, text: &str, silent: bool) -> Result<()> {
        let url = format!("{}/sendMessage", self.base_url.trim_end_matches('/'));
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_notification: silent,
        };

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Telegram API request failed: {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Telegram API non-2xx: {status} body={body}");
        }
        Ok(())
    }
}
