// SPDX-License-Identifier: PMPL-1.0-or-later
//! Template cache configuration.
//!
//! Defaults:
//! - eviction sweep every 60 seconds
//! - entries live at most 24 hours, and are dropped after 24 hours idle
//! - capacity 1000 entries, scaled by host memory (one step per GiB, 1x-8x)
//!
//! Each default can be overridden through the environment:
//! `NAMEDSQL_CACHE_CAPACITY`, `NAMEDSQL_CACHE_LIVE_SECS`,
//! `NAMEDSQL_CACHE_IDLE_SECS`, `NAMEDSQL_CACHE_EVICT_SECS`.

use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{NamedSqlError, Result};

pub const DEFAULT_EVICT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_LIVE_TIME_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_MAX_IDLE_SECS: u64 = 24 * 60 * 60;
/// Capacity before memory scaling.
pub const BASE_CAPACITY: usize = 1000;
pub const MAX_MEMORY_FACTOR: usize = 8;

pub const ENV_CAPACITY: &str = "NAMEDSQL_CACHE_CAPACITY";
pub const ENV_LIVE_SECS: &str = "NAMEDSQL_CACHE_LIVE_SECS";
pub const ENV_IDLE_SECS: &str = "NAMEDSQL_CACHE_IDLE_SECS";
pub const ENV_EVICT_SECS: &str = "NAMEDSQL_CACHE_EVICT_SECS";

/// Configuration for the template cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached statements. `None` derives it from host memory.
    pub capacity: Option<usize>,
    /// Absolute lifetime of an entry, in seconds.
    pub live_time_secs: u64,
    /// Entries not read for this many seconds are eligible for removal.
    pub max_idle_secs: u64,
    /// Minimum seconds between opportunistic expiry sweeps.
    pub evict_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: None,
            live_time_secs: DEFAULT_LIVE_TIME_SECS,
            max_idle_secs: DEFAULT_MAX_IDLE_SECS,
            evict_interval_secs: DEFAULT_EVICT_INTERVAL_SECS,
        }
    }
}

impl CacheConfig {
    /// Defaults overlaid with `NAMEDSQL_CACHE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`. Malformed or zero values
    /// are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(capacity) = positive::<usize>(&lookup, ENV_CAPACITY) {
            config.capacity = Some(capacity);
        }
        if let Some(secs) = positive::<u64>(&lookup, ENV_LIVE_SECS) {
            config.live_time_secs = secs;
        }
        if let Some(secs) = positive::<u64>(&lookup, ENV_IDLE_SECS) {
            config.max_idle_secs = secs;
        }
        if let Some(secs) = positive::<u64>(&lookup, ENV_EVICT_SECS) {
            config.evict_interval_secs = secs;
        }
        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == Some(0) {
            return Err(NamedSqlError::InvalidConfig(
                "capacity must be greater than zero".to_string(),
            ));
        }
        if self.live_time_secs == 0 {
            return Err(NamedSqlError::InvalidConfig(
                "live_time_secs must be greater than zero".to_string(),
            ));
        }
        if self.max_idle_secs == 0 {
            return Err(NamedSqlError::InvalidConfig(
                "max_idle_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Configured capacity, or the memory-scaled default.
    pub fn effective_capacity(&self) -> usize {
        self.capacity.unwrap_or_else(default_capacity)
    }

    pub fn live_time(&self) -> Duration {
        secs(self.live_time_secs)
    }

    pub fn max_idle(&self) -> Duration {
        secs(self.max_idle_secs)
    }

    pub fn evict_interval(&self) -> Duration {
        secs(self.evict_interval_secs)
    }
}

fn secs(value: u64) -> Duration {
    let max = (i64::MAX / 1000) as u64;
    Duration::seconds(value.min(max) as i64)
}

fn positive<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr + PartialEq + Default,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) if value != T::default() => Some(value),
        _ => {
            warn!(key = key, value = %raw, "Ignoring invalid cache setting (expected a positive integer)");
            None
        }
    }
}

/// Capacity multiplier for a host with `total_mb` of memory: one step per
/// GiB, clamped to `1..=MAX_MEMORY_FACTOR`.
pub fn memory_factor(total_mb: u64) -> usize {
    let steps = usize::try_from(total_mb / 1024).unwrap_or(MAX_MEMORY_FACTOR);
    steps.clamp(1, MAX_MEMORY_FACTOR)
}

/// `BASE_CAPACITY` scaled by host memory. Falls back to factor 1 when the
/// total cannot be determined.
pub fn default_capacity() -> usize {
    BASE_CAPACITY * memory_factor(total_memory_mb().unwrap_or(0))
}

fn total_memory_mb() -> Option<u64> {
    let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
    parse_meminfo_total_mb(&meminfo)
}

/// Extract `MemTotal` (reported in kB) from `/proc/meminfo` text, in MiB.
fn parse_meminfo_total_mb(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find_map(|line| line.strip_prefix("MemTotal:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb / 1024)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.capacity, None);
        assert_eq!(config.evict_interval(), Duration::seconds(60));
        assert_eq!(config.live_time(), Duration::hours(24));
        assert_eq!(config.max_idle(), Duration::hours(24));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_memory_factor_clamped() {
        assert_eq!(memory_factor(0), 1);
        assert_eq!(memory_factor(512), 1);
        assert_eq!(memory_factor(2048), 2);
        assert_eq!(memory_factor(4 * 1024 + 1000), 4);
        assert_eq!(memory_factor(8 * 1024), 8);
        assert_eq!(memory_factor(256 * 1024), 8);
    }

    #[test]
    fn test_default_capacity_in_range() {
        let capacity = default_capacity();
        assert!(capacity >= BASE_CAPACITY);
        assert!(capacity <= BASE_CAPACITY * MAX_MEMORY_FACTOR);
        assert_eq!(capacity % BASE_CAPACITY, 0);
    }

    #[test]
    fn test_parse_meminfo() {
        let text = "MemTotal:       16318412 kB\nMemFree:         1234567 kB\n";
        assert_eq!(parse_meminfo_total_mb(text), Some(15935));
        assert_eq!(parse_meminfo_total_mb("MemFree: 1 kB\n"), None);
        assert_eq!(parse_meminfo_total_mb("MemTotal: lots kB\n"), None);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = CacheConfig::from_lookup(lookup(&[
            (ENV_CAPACITY, "250"),
            (ENV_LIVE_SECS, "3600"),
            (ENV_IDLE_SECS, " 600 "),
            (ENV_EVICT_SECS, "5"),
        ]));
        assert_eq!(config.capacity, Some(250));
        assert_eq!(config.effective_capacity(), 250);
        assert_eq!(config.live_time_secs, 3600);
        assert_eq!(config.max_idle_secs, 600);
        assert_eq!(config.evict_interval_secs, 5);
    }

    #[test]
    fn test_from_lookup_ignores_bad_values() {
        let config = CacheConfig::from_lookup(lookup(&[
            (ENV_CAPACITY, "0"),
            (ENV_LIVE_SECS, "forever"),
            (ENV_IDLE_SECS, "-5"),
        ]));
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        let zero_capacity = CacheConfig {
            capacity: Some(0),
            ..CacheConfig::default()
        };
        assert!(matches!(
            zero_capacity.validate(),
            Err(NamedSqlError::InvalidConfig(_))
        ));

        let zero_live = CacheConfig {
            live_time_secs: 0,
            ..CacheConfig::default()
        };
        assert!(zero_live.validate().is_err());

        let zero_idle = CacheConfig {
            max_idle_secs: 0,
            ..CacheConfig::default()
        };
        assert!(zero_idle.validate().is_err());
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = CacheConfig {
            capacity: Some(64),
            ..CacheConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: CacheConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
