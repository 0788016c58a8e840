//! Alert event and notification target types

use serde::{Deserialize, Serialize};

use crate::counters::Category;

/// A threshold crossing for one (shop, category) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    /// Shop whose counter crossed the threshold
    pub shop: String,
    /// Category index that was incremented
    pub category: Category,
    /// Raw status code of the triggering event
    pub code: i64,
    /// Threshold that was reached
    pub threshold: u32,
    /// Time the alert was raised (unix millis)
    pub raised_at: i64,
}

impl AlertEvent {
    pub fn new(shop: impl Into<String>, category: Category, code: i64, threshold: u32) -> Self {
        Self {
            shop: shop.into(),
            category,
            code,
            threshold,
            raised_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Human-readable alert message
    pub fn message(&self) -> String {
        format!(
            "Count reached threshold {} for code {} at shop {}",
            self.threshold, self.code, self.shop
        )
    }
}

/// Notification target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NotifyTarget {
    /// Log to tracing
    Log,
    /// HTTP webhook
    Webhook {
        url: String,
        #[serde(default)]
        headers: std::collections::HashMap<String, String>,
    },
}

impl NotifyTarget {
    pub fn webhook(url: impl Into<String>) -> Self {
        NotifyTarget::Webhook {
            url: url.into(),
            headers: Default::default(),
        }
    }
}
