//! Revalidation cache for rendered pages.
//!
//! Listing and post pages are rendered at most once per revalidation window
//! (one hour by default) and served from memory in between:
//!
//! ```toml
//! [cache]
//! enabled = true
//! revalidate_seconds = 3600
//! max_entries = 256
//! ```

mod config;
mod lock;
mod middleware;
mod store;

pub use config::{CacheConfig, REVALIDATE_SECONDS};
pub use middleware::{CacheState, response_cache_layer};
pub use store::{
    CachedResponse, METRIC_CACHE_EVICT, METRIC_CACHE_HIT, METRIC_CACHE_MISS, ResponseStore,
};
