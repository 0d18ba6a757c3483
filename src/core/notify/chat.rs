//! Primary notification channel: the chat-room bus. Destination rooms are
//! resolved per agent through the bus's mapping endpoint; an agent with no
//! room mapping is simply not configured for chat delivery.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{DeliveryOutcome, NotificationChannel};
use crate::core::error::BridgeError;
use crate::core::notify::format::{NotificationEvent, render_chat};

pub struct ChatBusChannel {
    http: reqwest::Client,
    base_url: Option<String>,
    token: Option<String>,
}

#[derive(Deserialize)]
struct RoomMapping {
    room_id: Option<String>,
}

impl ChatBusChannel {
    pub fn new(base_url: Option<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
            token,
        }
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Resolve the agent's room. `None` is a normal outcome, not an error:
    /// the agent just has no chat destination configured.
    async fn lookup_room(&self, base: &str, agent_id: &str) -> Result<Option<String>> {
        let resp = self
            .authed(self.http.get(format!("{}/rooms/{}", base, agent_id)))
            .send()
            .await
            .map_err(|e| {
                anyhow::Error::new(BridgeError::Notification(format!("room lookup: {}", e)))
            })?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(anyhow::Error::new(BridgeError::Notification(format!(
                "room lookup failed with status {}",
                resp.status()
            ))));
        }
        let mapping: RoomMapping = resp.json().await.map_err(|e| {
            anyhow::Error::new(BridgeError::Notification(format!("room lookup body: {}", e)))
        })?;
        Ok(mapping.room_id)
    }
}

#[async_trait]
impl NotificationChannel for ChatBusChannel {
    fn name(&self) -> &str {
        "chat-bus"
    }

    async fn deliver(&self, event: &NotificationEvent) -> Result<DeliveryOutcome> {
        let Some(base) = &self.base_url else {
            return Ok(DeliveryOutcome::NotConfigured);
        };

        let Some(room_id) = self.lookup_room(base, &event.agent_id).await? else {
            debug!("No chat room mapped for agent {}", event.agent_id);
            return Ok(DeliveryOutcome::NotConfigured);
        };

        let body = render_chat(event);
        let resp = self
            .authed(self.http.post(format!("{}/rooms/{}/messages", base, room_id)))
            .json(&json!({ "body": body, "format": "markdown" }))
            .send()
            .await
            .map_err(|e| {
                anyhow::Error::new(BridgeError::Notification(format!("chat send: {}", e)))
            })?;

        if !resp.status().is_success() {
            return Err(anyhow::Error::new(BridgeError::Notification(format!(
                "chat send failed with status {}",
                resp.status()
            ))));
        }
        debug!("Delivered chat notification for {}", event.task_id);
        Ok(DeliveryOutcome::Delivered)
    }
}
