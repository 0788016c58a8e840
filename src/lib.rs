//! Shopwatch: per-shop status-code threshold alerting
//!
//! Shops report status codes over HTTP. Each monitored code maps to one of
//! four categories, and every shop keeps one counter per category. When a
//! counter reaches the threshold an alert is raised for that shop and
//! category and the counter starts over.
//!
//! # Features
//!
//! - **Static Classification**: Raw codes map to categories through a lookup table
//! - **Per-Shop Locking**: Shops never contend with each other
//! - **Atomic Crossings**: Increment, check, reset and alert happen under one lock
//! - **Fire-and-Forget Alerts**: Queued for a background dispatcher (log, webhook)
//! - **Audit Logging**: Events for unknown shops are logged as access attempts
//!
//! # Example
//!
//! ```no_run
//! use shopwatch::alerts::LogSink;
//! use shopwatch::counters::{CounterRegistry, ThresholdEngine};
//! use std::sync::Arc;
//!
//! let engine = ThresholdEngine::new(CounterRegistry::with_default_shops(), Arc::new(LogSink));
//!
//! for _ in 0..5 {
//!     if let Some(alert) = engine.record_event("conad", 2).unwrap() {
//!         println!("{}", alert.message());
//!     }
//! }
//! ```

pub mod alerts;
pub mod api;
pub mod counters;

// Re-export commonly used types
pub use alerts::{AlertEvent, AlertSink};
pub use counters::{CounterRegistry, EngineError, ThresholdEngine, THRESHOLD};
