use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

use super::classifier::{Category, CATEGORY_COUNT};
use super::engine::THRESHOLD;

/// Shops known to a default deployment
pub const DEFAULT_SHOPS: &[&str] = &["conad", "tigre", "gros"];

/// Per-category counters of one shop.
/// Guarded by its own lock so shops never contend with each other.
///
/// Counters only change through [`CounterSet::increment`], so every value
/// stays below [`THRESHOLD`].
#[derive(Debug, Default)]
pub struct CounterSet {
    counts: Mutex<[u32; CATEGORY_COUNT]>,
}

impl CounterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment one category. When it reaches [`THRESHOLD`] it is reset to
    /// zero and `true` is returned. The check and reset happen under the lock.
    ///
    /// Also returns the counter values as left by this step.
    pub fn increment(&self, category: Category) -> (bool, [u32; CATEGORY_COUNT]) {
        let mut counts = self.counts.lock();
        let count = &mut counts[category.index()];
        *count += 1;
        let crossed = *count >= THRESHOLD;
        if crossed {
            *count = 0;
        }
        (crossed, *counts)
    }

    /// Copy of the current counter values
    pub fn snapshot(&self) -> [u32; CATEGORY_COUNT] {
        *self.counts.lock()
    }
}

/// Counter values of one shop at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShopCounters {
    pub shop: String,
    pub counts: [u32; CATEGORY_COUNT],
}

/// Owns one counter set per known shop.
///
/// The set of shops is fixed at construction; counter sets live as long as
/// the registry and are never removed.
#[derive(Debug)]
pub struct CounterRegistry {
    shops: DashMap<String, Arc<CounterSet>>,
}

impl CounterRegistry {
    /// Create a registry for the given shop identifiers.
    /// Blank identifiers are skipped and duplicates share one counter set.
    pub fn new<I, S>(shops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let map = DashMap::new();
        for shop in shops {
            let shop = shop.as_ref().trim();
            if shop.is_empty() {
                continue;
            }
            map.entry(shop.to_string())
                .or_insert_with(|| Arc::new(CounterSet::new()));
        }

        Self { shops: map }
    }

    pub fn with_default_shops() -> Self {
        Self::new(DEFAULT_SHOPS)
    }

    /// Resolve a shop identifier to its counter set.
    ///
    /// Lookups are exact. An unknown identifier is logged as an audit event.
    pub fn resolve(&self, shop_id: &str) -> Result<Arc<CounterSet>, RegistryError> {
        match self.shops.get(shop_id) {
            Some(counters) => Ok(Arc::clone(&counters)),
            None => {
                tracing::warn!(
                    shop = %shop_id,
                    "Unauthorized access attempt detected for unknown shop"
                );
                Err(RegistryError::UnknownShop(shop_id.to_string()))
            }
        }
    }

    pub fn contains(&self, shop_id: &str) -> bool {
        self.shops.contains_key(shop_id)
    }

    /// Known shop identifiers, sorted
    pub fn shops(&self) -> Vec<String> {
        let mut shops: Vec<String> = self.shops.iter().map(|e| e.key().clone()).collect();
        shops.sort();
        shops
    }

    pub fn len(&self) -> usize {
        self.shops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shops.is_empty()
    }

    /// Counter snapshot of a single shop
    pub fn snapshot(&self, shop_id: &str) -> Result<ShopCounters, RegistryError> {
        let counters = self.resolve(shop_id)?;
        Ok(ShopCounters {
            shop: shop_id.to_string(),
            counts: counters.snapshot(),
        })
    }

    /// Counter snapshots of all shops, sorted by shop identifier
    pub fn snapshot_all(&self) -> Vec<ShopCounters> {
        // Collect the Arcs first so no map guard is held while locking counters
        let entries: Vec<(String, Arc<CounterSet>)> = self
            .shops
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();

        let mut snapshots: Vec<ShopCounters> = entries
            .into_iter()
            .map(|(shop, counters)| ShopCounters {
                shop,
                counts: counters.snapshot(),
            })
            .collect();
        snapshots.sort_by(|a, b| a.shop.cmp(&b.shop));
        snapshots
    }
}

impl Default for CounterRegistry {
    fn default() -> Self {
        Self::with_default_shops()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Shop '{0}' not found")]
    UnknownShop(String),
}
