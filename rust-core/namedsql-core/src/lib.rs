// SPDX-License-Identifier: PMPL-1.0-or-later
//! NamedSQL Core
//!
//! Rewrites SQL written with named parameters (`:name`, `#{name}`) into
//! positional `?` SQL, records the parameter names in order, derives a
//! Couchbase `$n` flavour on demand, and memoizes results in a bounded,
//! time-evicted [`TemplateCache`].
//!
//! ```rust
//! use namedsql_core::NamedSql;
//!
//! let stmt = NamedSql::global()
//!     .parse("SELECT * FROM users WHERE id = :id AND org = #{org}")
//!     .unwrap();
//! assert_eq!(stmt.positional_text(), "SELECT * FROM users WHERE id = ? AND org = ?");
//! assert_eq!(stmt.parameter_names(), ["id".to_string(), "org".to_string()]);
//! assert_eq!(stmt.couchbase().unwrap().positional_text(),
//!            "SELECT * FROM users WHERE id = $1 AND org = $2");
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod couchbase;
pub mod error;
pub mod params;
pub mod statement;
pub mod translator;

use std::sync::{Arc, OnceLock};

use tracing::warn;

pub use cache::{spawn_sweeper, CacheEntry, CacheStats, TemplateCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use couchbase::{translate_for_couchbase, CouchbaseView};
pub use error::{NamedSqlError, Result};
pub use namedsql_lexer::PlaceholderKind;
pub use params::ParamValue;
pub use statement::{ParameterStyle, ParsedStatement, StatementId, StatementKind};
pub use translator::translate;

static GLOBAL: OnceLock<NamedSql> = OnceLock::new();

/// Entry point pairing the translator with a template cache.
///
/// Most applications hold one `NamedSql` for their lifetime. Callers that
/// do not want to thread it through can use [`NamedSql::global`].
#[derive(Debug, Clone)]
pub struct NamedSql {
    cache: Arc<TemplateCache>,
}

impl NamedSql {
    pub fn new(config: CacheConfig) -> Result<Self> {
        Ok(Self::with_cache(Arc::new(TemplateCache::new(config)?)))
    }

    /// Share an existing cache, e.g. one built on a [`ManualClock`] or
    /// swept by [`spawn_sweeper`].
    pub fn with_cache(cache: Arc<TemplateCache>) -> Self {
        Self { cache }
    }

    /// The process-wide instance, configured from the environment on first
    /// use. An invalid environment configuration is logged and replaced by
    /// the defaults.
    pub fn global() -> &'static NamedSql {
        GLOBAL.get_or_init(|| {
            let config = CacheConfig::from_env();
            match TemplateCache::new(config) {
                Ok(cache) => Self::with_cache(Arc::new(cache)),
                Err(e) => {
                    warn!(error = %e, "Falling back to default template cache configuration");
                    Self::with_cache(Arc::new(TemplateCache::from_valid(
                        CacheConfig::default(),
                        Arc::new(SystemClock),
                    )))
                }
            }
        })
    }

    /// Translate `sql`, reusing the cached result for identical text.
    pub fn parse(&self, sql: &str) -> Result<Arc<ParsedStatement>> {
        self.cache.get_or_compute(sql)
    }

    pub fn cache(&self) -> &Arc<TemplateCache> {
        &self.cache
    }
}
