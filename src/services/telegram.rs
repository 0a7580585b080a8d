use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::DeliveryError;
use crate::models::{InboundCommand, Recipient};

/// Outbound half of the chat transport.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, recipient: Recipient, text: &str) -> Result<(), DeliveryError>;
}

// Server-side long-poll wait per getUpdates call.
const LONG_POLL_SECS: u64 = 30;
const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(api_base: &str, token: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    pub async fn get_me(&self) -> Result<BotUser, DeliveryError> {
        let res = self
            .http
            .get(self.method_url("getMe"))
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        res.json::<ApiResponse<BotUser>>().await?.into_result()
    }

    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, DeliveryError> {
        let res = self
            .http
            .get(self.method_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", LONG_POLL_SECS.to_string()),
                ("allowed_updates", r#"["message"]"#.to_string()),
            ])
            .timeout(Duration::from_secs(LONG_POLL_SECS + 10))
            .send()
            .await?;

        res.json::<ApiResponse<Vec<Update>>>().await?.into_result()
    }

    /// Starts long polling and returns the inbound command stream.
    ///
    /// The stream is unbounded and cannot be restarted: each update is
    /// acknowledged (by advancing the offset) as soon as it is queued.
    pub fn receive(&self) -> mpsc::UnboundedReceiver<InboundCommand> {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = self.clone();

        tokio::spawn(async move {
            let mut offset = 0i64;

            loop {
                let updates = match client.get_updates(offset).await {
                    Ok(u) => u,
                    Err(e) => {
                        tracing::warn!(error = %e, "getUpdates failed, retrying");
                        tokio::time::sleep(RETRY_DELAY).await;
                        continue;
                    }
                };

                for update in updates {
                    offset = offset.max(update.update_id + 1);

                    let Some(cmd) = update.into_command() else {
                        continue;
                    };
                    if tx.send(cmd).is_err() {
                        tracing::info!("command receiver dropped, stopping update poller");
                        return;
                    }
                }
            }
        });

        rx
    }
}

#[async_trait]
impl Transport for TelegramClient {
    async fn send(&self, recipient: Recipient, text: &str) -> Result<(), DeliveryError> {
        let body = SendMessage {
            chat_id: recipient,
            text,
        };

        let res = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&body)
            .timeout(Duration::from_secs(15))
            .send()
            .await?;

        let status = res.status();
        let parsed = res.json::<ApiResponse<serde_json::Value>>().await;

        match parsed {
            Ok(api) => api.into_result().map(|_| ()),
            Err(e) if !status.is_success() => Err(DeliveryError::Http {
                status: status.as_u16(),
                message: e.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: Recipient,
    text: &'a str,
}

/// Bot API envelope: `{"ok": true, "result": ...}` or
/// `{"ok": false, "description": "..."}`.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn into_result(self) -> Result<T, DeliveryError> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(DeliveryError::Rejected(
                self.description
                    .unwrap_or_else(|| "no description".to_string()),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BotUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

impl Update {
    pub fn into_command(self) -> Option<InboundCommand> {
        let msg = self.message?;
        let text = msg.text?;
        InboundCommand::from_text(msg.chat.id, &text)
    }
}
