pub mod callback;
pub mod chat;
pub mod format;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info, warn};

use format::NotificationEvent;

/// A channel either delivers, reports itself unconfigured for this agent,
/// or fails. Unconfigured and failed both hand the event to the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    NotConfigured,
}

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &str;
    async fn deliver(&self, event: &NotificationEvent) -> Result<DeliveryOutcome>;
}

/// Routes one event through the primary channel, falling back to the
/// secondary exactly once. No retries; a total failure is logged and
/// swallowed so notification trouble can never crash the task engine.
pub struct NotificationRouter {
    primary: Box<dyn NotificationChannel>,
    fallback: Box<dyn NotificationChannel>,
}

impl NotificationRouter {
    pub fn new(
        primary: Box<dyn NotificationChannel>,
        fallback: Box<dyn NotificationChannel>,
    ) -> Self {
        Self { primary, fallback }
    }

    /// Returns whether any channel delivered the event.
    pub async fn notify(&self, event: &NotificationEvent) -> bool {
        match self.primary.deliver(event).await {
            Ok(DeliveryOutcome::Delivered) => {
                info!(
                    "Notification for {} delivered via {}",
                    event.task_id,
                    self.primary.name()
                );
                return true;
            }
            Ok(DeliveryOutcome::NotConfigured) => {
                info!(
                    "{} not configured for agent {}, trying {}",
                    self.primary.name(),
                    event.agent_id,
                    self.fallback.name()
                );
            }
            Err(e) => {
                warn!(
                    "{} delivery failed for {}: {}, trying {}",
                    self.primary.name(),
                    event.task_id,
                    e,
                    self.fallback.name()
                );
            }
        }

        match self.fallback.deliver(event).await {
            Ok(DeliveryOutcome::Delivered) => {
                info!(
                    "Notification for {} delivered via {}",
                    event.task_id,
                    self.fallback.name()
                );
                true
            }
            Ok(DeliveryOutcome::NotConfigured) => {
                error!(
                    "No notification channel configured for agent {} (task {})",
                    event.agent_id, event.task_id
                );
                false
            }
            Err(e) => {
                error!(
                    "All notification channels failed for {}: {}",
                    event.task_id, e
                );
                false
            }
        }
    }
}
