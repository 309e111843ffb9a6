//! Configuration of a cache.

use crate::utils::config::DefMinMax;
use std::time::Duration;

/// Limit on the number of names kept in the cache.
const MAX_ENTRIES: DefMinMax<usize> = DefMinMax::new(10_000, 1, 100_000_000);

/// Limit on the time positive data may be cached.
///
/// According to [RFC 8767](https://www.rfc-editor.org/info/rfc8767) the
/// limit should be on the order of days to weeks with a recommended cap of
/// 604800 seconds (7 days).
const MAX_CACHE: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(604800),
    Duration::from_secs(1),
    Duration::from_secs(6048000),
);

/// Limit on the time negative data may be cached.
///
/// According to [RFC 2308](https://www.rfc-editor.org/info/rfc2308)
/// the limit should be one to three hours with a maximum of one day.
const MAX_NCACHE: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(3 * 3600),
    Duration::from_secs(1),
    Duration::from_secs(24 * 3600),
);

//------------ Config --------------------------------------------------------

/// Configuration of a cache.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "kebab-case")
)]
pub struct Config {
    /// Maximum number of names in the cache.
    max_entries: usize,

    /// Maximum time to cache positive data.
    max_cache: Duration,

    /// Maximum time to cache negative data.
    max_ncache: Duration,
}

impl Config {
    /// Creates a new config with default values.
    ///
    /// The default values are documented at the relevant set_* methods.
    #[must_use]
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the maximum number of names kept.
    #[must_use]
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Sets the maximum number of names kept.
    ///
    /// Once there are more names, the least recently used names are
    /// dropped together with all their data. The value has to be at least
    /// one and the default is 10,000.
    pub fn set_max_entries(&mut self, value: usize) {
        self.max_entries = MAX_ENTRIES.limit(value)
    }

    /// Returns the maximum time positive data is kept.
    #[must_use]
    pub fn max_cache(&self) -> Duration {
        self.max_cache
    }

    /// Sets the maximum time positive data is kept.
    ///
    /// The value has to be at least one second, at most 6,048,000 seconds
    /// (10 weeks) and the default is 604,800 seconds (one week).
    pub fn set_max_cache(&mut self, value: Duration) {
        self.max_cache = MAX_CACHE.limit(value)
    }

    /// Returns the maximum time negative data is kept.
    #[must_use]
    pub fn max_ncache(&self) -> Duration {
        self.max_ncache
    }

    /// Sets the maximum time negative data is kept.
    ///
    /// The value has to be at least one second, at most 86,400 seconds
    /// (one day) and the default is 10,800 seconds (three hours).
    pub fn set_max_ncache(&mut self, value: Duration) {
        self.max_ncache = MAX_NCACHE.limit(value)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: MAX_ENTRIES.default(),
            max_cache: MAX_CACHE.default(),
            max_ncache: MAX_NCACHE.default(),
        }
    }
}
