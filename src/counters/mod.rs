//! Counter/threshold state machine
//!
//! Maps raw status codes to monitored categories, keeps one counter set per
//! known shop and performs the increment-check-reset step atomically per shop.

pub mod classifier;
pub mod engine;
pub mod registry;

pub use classifier::{Category, ClassifyError, CodeClassifier, CATEGORY_COUNT};
pub use engine::{parse_code, EngineError, EngineStats, ThresholdEngine, THRESHOLD};
pub use registry::{CounterRegistry, CounterSet, RegistryError, ShopCounters, DEFAULT_SHOPS};
