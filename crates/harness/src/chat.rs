//! Chat transports.
//!
//! A chat transport sends a command to a bot-like peer and exposes the
//! conversation as an append-only log. Callers remember the cursor returned
//! by [`ChatTransport::send`] and only look at messages after it.

use crate::transport::{HttpOutcome, HttpTransport};
use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::debug;

/// One message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub text: String,
    pub from_bot: bool,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from_bot: false,
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from_bot: true,
        }
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send `text` and return a cursor marking the conversation position
    /// just before it.
    async fn send(&self, text: &str) -> Result<usize>;

    /// Every message recorded after `cursor`, oldest first.
    async fn messages_since(&self, cursor: usize) -> Result<Vec<ChatMessage>>;

    /// True when replies are complete by the time `send` returns, so there
    /// is nothing to wait for.
    fn replies_are_inline(&self) -> bool {
        false
    }
}

/// Chat over the agent's HTTP message-relay API.
///
/// Each send POSTs `{content: {text}, userId, roomId}` to the first
/// candidate path that exists and records the JSON reply as bot messages.
pub struct HttpChatTransport {
    http: HttpTransport,
    paths: Vec<String>,
    user_id: String,
    room_id: String,
    log: Mutex<Vec<ChatMessage>>,
}

impl HttpChatTransport {
    pub fn new(http: HttpTransport, paths: Vec<String>, user_id: String) -> Self {
        Self {
            http,
            paths,
            user_id,
            room_id: format!("agentprobe-{}", uuid::Uuid::new_v4()),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send(&self, text: &str) -> Result<usize> {
        let payload = json!({
            "content": { "text": text },
            "userId": self.user_id,
            "roomId": self.room_id,
        });

        let outcome = self
            .http
            .first_available(Method::POST, &self.paths, Some(&payload))
            .await;

        let replies = match &outcome {
            HttpOutcome::Response { body, .. } if outcome.is_success() => match body.json() {
                Some(value) => extract_replies(value),
                None => {
                    let text = body.text();
                    if text.trim().is_empty() {
                        Vec::new()
                    } else {
                        vec![text]
                    }
                }
            },
            _ => bail!("message relay failed: {}", outcome),
        };
        debug!("Relay {} returned {} reply(ies)", outcome.path(), replies.len());

        let mut log = self.log.lock().await;
        let cursor = log.len();
        log.push(ChatMessage::user(text));
        log.extend(replies.into_iter().map(ChatMessage::bot));
        Ok(cursor)
    }

    async fn messages_since(&self, cursor: usize) -> Result<Vec<ChatMessage>> {
        let log = self.log.lock().await;
        Ok(log.iter().skip(cursor).cloned().collect())
    }

    fn replies_are_inline(&self) -> bool {
        true
    }
}

/// Pull reply texts out of the shapes agent runtimes answer with: an array of
/// `{text}` / `{content: {text}}` objects or strings, or a single such object.
pub fn extract_replies(value: &Value) -> Vec<String> {
    fn one(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map
                .get("text")
                .and_then(Value::as_str)
                .or_else(|| {
                    map.get("content")
                        .and_then(|c| c.get("text"))
                        .and_then(Value::as_str)
                })
                .map(str::to_string),
            _ => None,
        }
    }

    match value {
        Value::Array(items) => items.iter().filter_map(one).collect(),
        other => one(other).into_iter().collect(),
    }
}
