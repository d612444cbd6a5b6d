// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Template cache.
//!
//! A [`TemplateCache`] memoizes [`ParsedStatement`]s keyed by the exact raw SQL
//! text, so statements executed in a hot loop are tokenized and rewritten once.
//! The cache supports:
//!
//! - **Exact keys**: no whitespace or case normalization; `"SELECT 1"` and
//!   `"SELECT  1"` are different entries.
//! - **Live time**: entries older than `live_time_secs` are expired.
//! - **Idle time**: entries not read for `max_idle_secs` are expired. Reads
//!   refresh the idle timer without taking the write lock.
//! - **Capacity**: inserting into a full cache first drops expired entries,
//!   then the least-recently-accessed one.
//! - **Sweeps**: expired entries are removed opportunistically on insert (at
//!   most once per `evict_interval_secs`), by [`TemplateCache::evict_expired`],
//!   or by the optional task from [`spawn_sweeper`].
//! - **Hit/miss statistics** tracked with atomic counters.
//!
//! Concurrent misses on the same key may both translate; the last insert
//! wins. Translation is a pure function of the text, so both callers get
//! equal statements. Failed translations are never cached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard, Weak};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::statement::ParsedStatement;
use crate::translator::translate;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A cached statement with its expiry timestamps.
#[derive(Debug)]
pub struct CacheEntry {
    statement: Arc<ParsedStatement>,
    created_at: DateTime<Utc>,
    /// Unix milliseconds of the last read; atomic so hits only need a read lock.
    last_accessed_ms: AtomicI64,
}

impl CacheEntry {
    fn new(statement: Arc<ParsedStatement>, now: DateTime<Utc>) -> Self {
        Self {
            statement,
            created_at: now,
            last_accessed_ms: AtomicI64::new(now.timestamp_millis()),
        }
    }

    pub fn statement(&self) -> &Arc<ParsedStatement> {
        &self.statement
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_accessed(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_accessed_ms.load(Ordering::Relaxed))
            .unwrap_or(self.created_at)
    }

    fn touch(&self, now: DateTime<Utc>) {
        self.last_accessed_ms
            .fetch_max(now.timestamp_millis(), Ordering::Relaxed);
    }

    fn is_expired(&self, now: DateTime<Utc>, config: &CacheConfig) -> bool {
        now.signed_duration_since(self.created_at) > config.live_time()
            || now.signed_duration_since(self.last_accessed()) > config.max_idle()
    }
}

/// Aggregate statistics about cache effectiveness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of statements currently cached.
    pub total_entries: usize,
    /// Maximum number of statements the cache holds.
    pub capacity: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    /// Entries removed for age, idleness or capacity.
    pub eviction_count: u64,
    /// `hit_count / (hit_count + miss_count)`, or 0.0 before any lookup.
    pub hit_ratio: f64,
}

// ---------------------------------------------------------------------------
// TemplateCache
// ---------------------------------------------------------------------------

/// Bounded, time-evicted cache from raw SQL text to its translation.
///
/// # Example
///
/// ```rust
/// use namedsql_core::{CacheConfig, TemplateCache};
///
/// let cache = TemplateCache::new(CacheConfig::default()).unwrap();
/// let stmt = cache.get_or_compute("SELECT * FROM t WHERE id = :id").unwrap();
/// assert_eq!(stmt.positional_text(), "SELECT * FROM t WHERE id = ?");
/// assert_eq!(stmt.parameter_names(), ["id".to_string()]);
/// ```
#[derive(Debug)]
pub struct TemplateCache {
    /// Cache configuration (immutable after construction).
    config: CacheConfig,
    /// Resolved capacity.
    capacity: usize,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, CacheEntry>>,
    /// Unix milliseconds of the last expiry sweep.
    last_sweep_ms: AtomicI64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    eviction_count: AtomicU64,
}

impl TemplateCache {
    /// Create a cache on the system clock.
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache on a custom clock.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid(config, clock))
    }

    pub(crate) fn from_valid(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let capacity = config.effective_capacity();
        let now = clock.now();
        debug!(
            capacity = capacity,
            live_time_secs = config.live_time_secs,
            max_idle_secs = config.max_idle_secs,
            "Created template cache"
        );
        Self {
            config,
            capacity,
            clock,
            entries: RwLock::new(HashMap::new()),
            last_sweep_ms: AtomicI64::new(now.timestamp_millis()),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            eviction_count: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Return the cached translation of `sql`, translating and caching it
    /// on a miss. Translation errors are returned and not cached.
    pub fn get_or_compute(&self, sql: &str) -> Result<Arc<ParsedStatement>> {
        if let Some(statement) = self.get(sql) {
            return Ok(statement);
        }

        let statement = Arc::new(translate(sql)?);
        self.insert(sql, Arc::clone(&statement));
        Ok(statement)
    }

    /// Look up `sql` without translating. A hit refreshes the idle timer.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&self, sql: &str) -> Option<Arc<ParsedStatement>> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(sql) {
                Some(entry) if !entry.is_expired(now, &self.config) => {
                    entry.touch(now);
                    self.hit_count.fetch_add(1, Ordering::Relaxed);
                    trace!(id = %entry.statement.id(), "Template cache hit");
                    return Some(Arc::clone(&entry.statement));
                }
                Some(_) => {}
                None => {
                    self.miss_count.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
            }
        }

        // Expired: re-check under the write lock, another thread may have
        // replaced it in between.
        let mut entries = self.write_entries();
        if entries
            .get(sql)
            .is_some_and(|entry| entry.is_expired(now, &self.config))
        {
            entries.remove(sql);
            self.eviction_count.fetch_add(1, Ordering::Relaxed);
        }
        self.miss_count.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Whether a live entry for `sql` exists. Does not refresh the idle
    /// timer or touch the statistics.
    pub fn contains(&self, sql: &str) -> bool {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(sql)
            .is_some_and(|entry| !entry.is_expired(now, &self.config))
    }

    /// Remove the entry for `sql`. Returns `true` if one existed.
    pub fn invalidate(&self, sql: &str) -> bool {
        let removed = self.write_entries().remove(sql).is_some();
        if removed {
            self.eviction_count.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Remove every entry.
    pub fn invalidate_all(&self) {
        let mut entries = self.write_entries();
        let count = entries.len() as u64;
        entries.clear();
        self.eviction_count.fetch_add(count, Ordering::Relaxed);
        debug!(evicted = count, "Template cache cleared");
    }

    /// Remove every expired entry. Returns the number removed.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        self.last_sweep_ms
            .store(now.timestamp_millis(), Ordering::Relaxed);
        let mut entries = self.write_entries();
        self.remove_expired(&mut entries, now)
    }

    /// Sweep expired entries if `evict_interval_secs` has elapsed since the
    /// last sweep. Returns the number removed.
    pub fn maybe_sweep(&self) -> usize {
        let now = self.clock.now();
        let now_ms = now.timestamp_millis();
        let last = self.last_sweep_ms.load(Ordering::Relaxed);
        if now_ms - last < self.config.evict_interval().num_milliseconds() {
            return 0;
        }
        // Only one caller wins the sweep for this interval.
        if self
            .last_sweep_ms
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return 0;
        }
        let mut entries = self.write_entries();
        self.remove_expired(&mut entries, now)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return aggregate cache statistics.
    pub fn stats(&self) -> CacheStats {
        let hits = self.hit_count.load(Ordering::Relaxed);
        let misses = self.miss_count.load(Ordering::Relaxed);
        let total_lookups = hits + misses;
        let hit_ratio = if total_lookups > 0 {
            hits as f64 / total_lookups as f64
        } else {
            0.0
        };

        CacheStats {
            total_entries: self.len(),
            capacity: self.capacity,
            hit_count: hits,
            miss_count: misses,
            eviction_count: self.eviction_count.load(Ordering::Relaxed),
            hit_ratio,
        }
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert under the write lock, making room first if needed.
    fn insert(&self, sql: &str, statement: Arc<ParsedStatement>) {
        self.maybe_sweep();

        let now = self.clock.now();
        let id = statement.id().clone();
        let mut entries = self.write_entries();

        if !entries.contains_key(sql) && entries.len() >= self.capacity {
            self.remove_expired(&mut entries, now);
            while entries.len() >= self.capacity {
                if !self.evict_lru(&mut entries) {
                    break;
                }
            }
        }

        entries.insert(sql.to_string(), CacheEntry::new(statement, now));
        debug!(id = %id, entries = entries.len(), "Cached statement");
    }

    fn remove_expired(&self, entries: &mut HashMap<String, CacheEntry>, now: DateTime<Utc>) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now, &self.config));
        let count = before - entries.len();

        if count > 0 {
            self.eviction_count
                .fetch_add(count as u64, Ordering::Relaxed);
            debug!(evicted = count, remaining = entries.len(), "Swept expired statements");
        }
        count
    }

    /// Remove the entry with the oldest access time. Returns whether one was removed.
    fn evict_lru(&self, entries: &mut HashMap<String, CacheEntry>) -> bool {
        let oldest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed_ms.load(Ordering::Relaxed))
            .map(|(key, _)| key.clone());

        match oldest {
            Some(key) => {
                entries.remove(&key);
                self.eviction_count.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }
}

/// Periodically sweep `cache` on the current tokio runtime, every
/// `evict_interval_secs`. The task holds a weak reference and ends once the
/// cache is dropped. Must be called from within a runtime.
pub fn spawn_sweeper(cache: &Arc<TemplateCache>) -> tokio::task::JoinHandle<()> {
    let period = std::time::Duration::from_secs(cache.config.evict_interval_secs.max(1));
    let weak: Weak<TemplateCache> = Arc::downgrade(cache);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let Some(cache) = weak.upgrade() else {
                break;
            };
            let evicted = cache.evict_expired();
            trace!(evicted = evicted, "Periodic template cache sweep");
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
