//! Alert delivery
//!
//! Alerts raised by the threshold engine go to an [`AlertSink`]. The
//! [`ChannelSink`] queues them for an [`AlertDispatcher`], which forwards each
//! one to the configured notification targets in the background.

pub mod config;
pub mod dispatcher;
pub mod notifier;
pub mod sink;

pub use config::{AlertEvent, NotifyTarget};
pub use dispatcher::AlertDispatcher;
pub use notifier::{Notifier, NotifierError};
pub use sink::{AlertSink, ChannelSink, LogSink};
