//! Background alert dispatcher

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use super::config::AlertEvent;
use super::notifier::Notifier;

/// Drains queued alerts and forwards them to the notifier
pub struct AlertDispatcher {
    /// Notifier for sending notifications
    notifier: Arc<Notifier>,
    /// Alerts successfully delivered
    delivered: Arc<AtomicU64>,
    /// Alerts whose delivery failed
    failed: Arc<AtomicU64>,
    /// Shutdown signal sender
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl AlertDispatcher {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            notifier: Arc::new(notifier),
            delivered: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
            shutdown_tx: None,
        }
    }

    /// Start the background dispatcher.
    /// The task ends when stopped or when every sender of `alerts` is dropped.
    pub fn start(&mut self, mut alerts: mpsc::Receiver<AlertEvent>) -> tokio::task::JoinHandle<()> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown_tx = Some(shutdown_tx);

        let notifier = Arc::clone(&self.notifier);
        let delivered = Arc::clone(&self.delivered);
        let failed = Arc::clone(&self.failed);

        tokio::spawn(async move {
            tracing::info!(targets = notifier.targets().len(), "Alert dispatcher started");

            loop {
                tokio::select! {
                    event = alerts.recv() => {
                        let Some(event) = event else {
                            break;
                        };
                        Self::deliver(&notifier, &delivered, &failed, &event).await;
                    }
                    _ = shutdown_rx.recv() => {
                        // Refuse new alerts, then deliver what is already queued
                        alerts.close();
                        while let Some(event) = alerts.recv().await {
                            Self::deliver(&notifier, &delivered, &failed, &event).await;
                        }
                        break;
                    }
                }
            }

            tracing::info!("Alert dispatcher stopped");
        })
    }

    /// Send one alert and record the outcome
    async fn deliver(
        notifier: &Notifier,
        delivered: &AtomicU64,
        failed: &AtomicU64,
        event: &AlertEvent,
    ) {
        match notifier.notify(event).await {
            Ok(()) => {
                delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    shop = %event.shop,
                    code = event.code,
                    error = %e,
                    "Failed to send notification"
                );
            }
        }
    }

    /// Stop the background dispatcher once queued alerts are delivered
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}
