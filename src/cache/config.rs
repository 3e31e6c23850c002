//! Revalidation cache configuration.

use std::{num::NonZeroUsize, time::Duration};

/// One hour: the longest a rendered listing or post page may be served stale.
pub const REVALIDATE_SECONDS: u64 = 3600;
const DEFAULT_MAX_ENTRIES: usize = 256;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub revalidate_seconds: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            revalidate_seconds: REVALIDATE_SECONDS,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            revalidate_seconds: settings.revalidate_seconds.get(),
            max_entries: settings.max_entries.get(),
        }
    }
}

impl CacheConfig {
    pub fn revalidate_after(&self) -> Duration {
        Duration::from_secs(self.revalidate_seconds)
    }

    /// Capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }

    /// `Cache-Control` value advertised on cacheable pages.
    pub fn cache_control(&self) -> String {
        format!(
            "public, s-maxage={}, stale-while-revalidate",
            self.revalidate_seconds
        )
    }
}
