use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::classifier::CodeClassifier;
use super::registry::{CounterRegistry, RegistryError};
use crate::alerts::{AlertEvent, AlertSink};

/// Occurrences of one category that raise an alert
pub const THRESHOLD: u32 = 5;

/// Parse a raw status code received as text
pub fn parse_code(text: &str) -> Result<i64, EngineError> {
    text.parse::<i64>()
        .map_err(|_| EngineError::InvalidCode(text.to_string()))
}

/// Process-wide event counters
#[derive(Debug, Default)]
struct EngineCounters {
    received: AtomicU64,
    ignored: AtomicU64,
    rejected: AtomicU64,
    alerts: AtomicU64,
}

/// Snapshot of engine activity since startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub events_received: u64,
    pub events_ignored: u64,
    pub events_rejected: u64,
    pub alerts_emitted: u64,
}

/// Threshold engine.
///
/// Each recorded event increments the counter of its category for the shop.
/// When the counter reaches [`THRESHOLD`] it is reset to zero and an alert
/// is emitted, all under the shop's lock. Other categories are never touched.
pub struct ThresholdEngine {
    registry: CounterRegistry,
    classifier: CodeClassifier,
    sink: Arc<dyn AlertSink>,
    counters: EngineCounters,
}

impl ThresholdEngine {
    pub fn new(registry: CounterRegistry, sink: Arc<dyn AlertSink>) -> Self {
        Self {
            registry,
            classifier: CodeClassifier::new(),
            sink,
            counters: EngineCounters::default(),
        }
    }

    pub fn registry(&self) -> &CounterRegistry {
        &self.registry
    }

    /// Record one event for a shop.
    ///
    /// Returns the alert raised by this event, if any. Unknown shops are an
    /// error; unmonitored codes are logged and accepted without effect.
    pub fn record_event(
        &self,
        shop_id: &str,
        raw_code: i64,
    ) -> Result<Option<AlertEvent>, EngineError> {
        self.counters.received.fetch_add(1, Ordering::Relaxed);

        let counter_set = self.registry.resolve(shop_id).map_err(|e| {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            EngineError::from(e)
        })?;

        let category = match self.classifier.classify(raw_code) {
            Ok(category) => category,
            Err(e) => {
                self.counters.ignored.fetch_add(1, Ordering::Relaxed);
                tracing::info!(shop = %shop_id, code = raw_code, "Ignoring event: {}", e);
                return Ok(None);
            }
        };

        let (crossed, counts) = counter_set.increment(category);

        tracing::debug!(shop = %shop_id, counts = ?counts, "Status counters updated");

        if !crossed {
            return Ok(None);
        }

        self.counters.alerts.fetch_add(1, Ordering::Relaxed);
        let event = AlertEvent::new(shop_id, category, raw_code, THRESHOLD);
        self.sink.emit(event.clone());
        Ok(Some(event))
    }

    /// Record one event whose code is still text.
    /// The code is parsed before the shop is looked up.
    pub fn record_raw(
        &self,
        shop_id: &str,
        code_text: &str,
    ) -> Result<Option<AlertEvent>, EngineError> {
        let code = match parse_code(code_text) {
            Ok(code) => code,
            Err(e) => {
                self.counters.received.fetch_add(1, Ordering::Relaxed);
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };
        self.record_event(shop_id, code)
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            events_received: self.counters.received.load(Ordering::Relaxed),
            events_ignored: self.counters.ignored.load(Ordering::Relaxed),
            events_rejected: self.counters.rejected.load(Ordering::Relaxed),
            alerts_emitted: self.counters.alerts.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid code '{0}'")]
    InvalidCode(String),

    #[error("Shop '{0}' not found")]
    UnknownShop(String),
}

impl From<RegistryError> for EngineError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::UnknownShop(shop) => EngineError::UnknownShop(shop),
        }
    }
}
