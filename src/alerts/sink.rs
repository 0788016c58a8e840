//! Alert sinks
//!
//! The engine hands every alert to an [`AlertSink`] and moves on. Sinks must
//! not block: delivery to notification targets happens elsewhere.

use tokio::sync::mpsc::{self, error::TrySendError};

use super::config::AlertEvent;

/// Receives alerts emitted by the threshold engine
pub trait AlertSink: Send + Sync {
    fn emit(&self, event: AlertEvent);
}

/// Sink that only logs alerts
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn emit(&self, event: AlertEvent) {
        tracing::warn!(
            shop = %event.shop,
            code = event.code,
            category = event.category.index(),
            "{}",
            event.message()
        );
    }
}

/// Sink that queues alerts on a bounded channel for an [`AlertDispatcher`](super::AlertDispatcher).
/// Alerts are dropped with a warning when the queue is full or closed.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<AlertEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its queue
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<AlertEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl AlertSink for ChannelSink {
    fn emit(&self, event: AlertEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(shop = %event.shop, code = event.code, "Alert queue full, dropping alert");
            }
            Err(TrySendError::Closed(event)) => {
                tracing::warn!(shop = %event.shop, code = event.code, "Alert queue closed, dropping alert");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counters::CodeClassifier;

    fn make_event(code: i64) -> AlertEvent {
        let category = CodeClassifier::new().classify(code).unwrap();
        AlertEvent::new("conad", category, code, 5)
    }

    #[test]
    fn test_channel_sink_queues() {
        let (sink, mut rx) = ChannelSink::new(4);

        sink.emit(make_event(1));
        sink.emit(make_event(2));

        assert_eq!(rx.try_recv().unwrap().code, 1);
        assert_eq!(rx.try_recv().unwrap().code, 2);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_drops_when_full() {
        let (sink, mut rx) = ChannelSink::new(1);

        sink.emit(make_event(1));
        sink.emit(make_event(2));

        assert_eq!(rx.try_recv().unwrap().code, 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_closed() {
        let (sink, rx) = ChannelSink::new(1);
        drop(rx);

        // Must not panic
        sink.emit(make_event(6));
    }
}
