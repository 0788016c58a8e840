//! Notification handlers for alerts

use std::collections::HashMap;

use super::config::{AlertEvent, NotifyTarget};

/// Notifier for sending alert notifications
pub struct Notifier {
    client: reqwest::Client,
    targets: Vec<NotifyTarget>,
}

impl Notifier {
    /// Create a notifier that only logs
    pub fn new() -> Self {
        Self::with_targets(vec![NotifyTarget::Log])
    }

    pub fn with_targets(targets: Vec<NotifyTarget>) -> Self {
        Self {
            client: reqwest::Client::new(),
            targets,
        }
    }

    pub fn targets(&self) -> &[NotifyTarget] {
        &self.targets
    }

    /// Send notification to all targets
    pub async fn notify(&self, event: &AlertEvent) -> Result<(), NotifierError> {
        let mut errors = Vec::new();

        for target in &self.targets {
            if let Err(e) = self.notify_target(event, target).await {
                errors.push(e);
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(NotifierError::Multiple(errors)),
        }
    }

    /// Send notification to a single target
    async fn notify_target(
        &self,
        event: &AlertEvent,
        target: &NotifyTarget,
    ) -> Result<(), NotifierError> {
        match target {
            NotifyTarget::Log => {
                tracing::warn!(
                    shop = %event.shop,
                    code = event.code,
                    category = event.category.index(),
                    "Alert triggered: {}",
                    event.message()
                );
                Ok(())
            }
            NotifyTarget::Webhook { url, headers } => self.send_webhook(event, url, headers).await,
        }
    }

    /// Send webhook notification
    async fn send_webhook(
        &self,
        event: &AlertEvent,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<(), NotifierError> {
        let payload = serde_json::json!({
            "shop": event.shop,
            "category": event.category,
            "code": event.code,
            "threshold": event.threshold,
            "message": event.message(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "raised_at": event.raised_at,
        });

        let mut request = self.client.post(url).json(&payload);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request.send().await.map_err(|e| {
            NotifierError::Webhook(format!("Failed to send webhook: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(NotifierError::Webhook(format!(
                "Webhook returned status {}",
                response.status()
            )));
        }

        tracing::debug!(shop = %event.shop, url = %url, "Webhook notification sent");

        Ok(())
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Notifier errors
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Webhook error: {0}")]
    Webhook(String),

    #[error("Multiple notification failures: {0:?}")]
    Multiple(Vec<NotifierError>),
}
