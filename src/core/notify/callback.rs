//! Fallback notification channel: a bare HTTP POST of a role + text payload
//! to the agent's messaging endpoint. Any 2xx response counts as delivered.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{DeliveryOutcome, NotificationChannel};
use crate::core::error::BridgeError;
use crate::core::notify::format::{NotificationEvent, render_callback};

pub struct HttpCallbackChannel {
    http: reqwest::Client,
    base_url: Option<String>,
}

impl HttpCallbackChannel {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
        }
    }
}

#[async_trait]
impl NotificationChannel for HttpCallbackChannel {
    fn name(&self) -> &str {
        "http-callback"
    }

    async fn deliver(&self, event: &NotificationEvent) -> Result<DeliveryOutcome> {
        let Some(base) = &self.base_url else {
            return Ok(DeliveryOutcome::NotConfigured);
        };

        let url = format!("{}/v1/agents/{}/messages", base, event.agent_id);
        let resp = self
            .http
            .post(&url)
            .json(&json!({ "role": "system", "content": render_callback(event) }))
            .send()
            .await
            .map_err(|e| {
                anyhow::Error::new(BridgeError::Notification(format!("callback send: {}", e)))
            })?;

        if !resp.status().is_success() {
            return Err(anyhow::Error::new(BridgeError::Notification(format!(
                "callback failed with status {}",
                resp.status()
            ))));
        }
        debug!("Delivered callback notification for {}", event.task_id);
        Ok(DeliveryOutcome::Delivered)
    }
}
