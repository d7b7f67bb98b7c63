//! In-memory response cache with per-data-type TTLs.
//!
//! Entries expire lazily: a read past the TTL counts as a miss and evicts
//! the entry. [`ResponseCache::sweep`] drops everything expired and is run
//! periodically by the service. Only real upstream data is ever stored.
//!
//! The cache is a pure optimization. With `enabled = false` every read misses
//! and every write is dropped, and the service behaves the same apart from
//! the extra upstream calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};
use serde::Serialize;
use tokio::time::Instant;

use crate::clock::Clock;
use crate::config::CacheConfig;
use crate::models::{DataType, HistoricalSeries, MarketSnapshot, PriceRecord, SourceId};

/// Cache key: data type plus a query string such as `"historical:xrp:7"`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CacheKey {
    pub data_type: DataType,
    pub query: String,
}

impl CacheKey {
    pub fn new(data_type: DataType, query: impl Into<String>) -> Self {
        Self {
            data_type,
            query: query.into(),
        }
    }
}

/// A cached canonical record.
#[derive(Clone, Debug, PartialEq)]
pub enum CachedData {
    Price(PriceRecord),
    Historical(HistoricalSeries),
    Market(MarketSnapshot),
}

/// Canonical records that can live in the cache.
pub trait Cacheable: Clone + Sized {
    const DATA_TYPE: DataType;

    fn into_cached(self) -> CachedData;

    fn from_cached(data: &CachedData) -> Option<Self>;
}

impl Cacheable for PriceRecord {
    const DATA_TYPE: DataType = DataType::Price;

    fn into_cached(self) -> CachedData {
        CachedData::Price(self)
    }

    fn from_cached(data: &CachedData) -> Option<Self> {
        match data {
            CachedData::Price(record) => Some(record.clone()),
            _ => None,
        }
    }
}

impl Cacheable for HistoricalSeries {
    const DATA_TYPE: DataType = DataType::Historical;

    fn into_cached(self) -> CachedData {
        CachedData::Historical(self)
    }

    fn from_cached(data: &CachedData) -> Option<Self> {
        match data {
            CachedData::Historical(series) => Some(series.clone()),
            _ => None,
        }
    }
}

impl Cacheable for MarketSnapshot {
    const DATA_TYPE: DataType = DataType::Market;

    fn into_cached(self) -> CachedData {
        CachedData::Market(self)
    }

    fn from_cached(data: &CachedData) -> Option<Self> {
        match data {
            CachedData::Market(snapshot) => Some(snapshot.clone()),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    data: CachedData,
    source: SourceId,
    stored_at: Instant,
}

/// Cache counters for monitoring.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub inserts: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// TTL cache for canonical records.
pub struct ResponseCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    stats: Mutex<CacheStats>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            stats: Mutex::new(CacheStats::default()),
            config,
            clock,
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("Response cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_stats(&self) -> MutexGuard<'_, CacheStats> {
        self.stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Time-to-live of a data type.
    pub fn ttl(&self, data_type: DataType) -> Duration {
        match data_type {
            DataType::Price => self.config.price_ttl,
            DataType::Historical => self.config.historical_ttl,
            DataType::Market => self.config.market_ttl,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Fresh cached value and the source it came from.
    pub fn get<T: Cacheable>(&self, query: &str) -> Option<(T, SourceId)> {
        if !self.config.enabled {
            return None;
        }

        let key = CacheKey::new(T::DATA_TYPE, query);
        let ttl = self.ttl(T::DATA_TYPE);
        let now = self.clock.now();

        let mut entries = self.lock_entries();
        let (hit, expired) = match entries.get(&key) {
            Some(entry) if now.saturating_duration_since(entry.stored_at) > ttl => (None, true),
            Some(entry) => (
                T::from_cached(&entry.data).map(|data| (data, entry.source.clone())),
                false,
            ),
            None => (None, false),
        };

        if expired {
            entries.remove(&key);
            debug!("Cache: '{}' expired", query);
        }
        drop(entries);

        let mut stats = self.lock_stats();
        if hit.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
            if expired {
                stats.expirations += 1;
            }
        }

        hit
    }

    /// Store a value fetched from `source`.
    pub fn set<T: Cacheable>(&self, query: &str, data: T, source: SourceId) {
        if !self.config.enabled {
            return;
        }

        let entry = CacheEntry {
            data: data.into_cached(),
            source,
            stored_at: self.clock.now(),
        };
        self.lock_entries()
            .insert(CacheKey::new(T::DATA_TYPE, query), entry);
        self.lock_stats().inserts += 1;
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock_entries();
        let before = entries.len();

        entries.retain(|key, entry| {
            now.saturating_duration_since(entry.stored_at) <= self.ttl(key.data_type)
        });

        let removed = before - entries.len();
        drop(entries);

        if removed > 0 {
            self.lock_stats().expirations += removed as u64;
            debug!("Cache: swept {} expired entries", removed);
        }
        removed
    }

    pub fn clear(&self) {
        self.lock_entries().clear();
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.len();
        CacheStats {
            entries,
            ..self.lock_stats().clone()
        }
    }
}
