//! Client-side cache for paginated, asynchronously fetched data.
//!
//! This module provides:
//! - A keyed store of page results with fetch timestamps and status
//! - Request deduplication: at most one fetch in flight per key
//! - Stale-while-revalidate reads that never block on cached data
//! - Best-effort prefetching of adjacent pages

mod executor;
mod layer;
mod policy;
mod prefetch;
mod storage;
mod traits;

pub use executor::RetryPolicy;
pub use layer::CacheLayer;
pub use policy::StalenessPolicy;
pub use prefetch::Prefetcher;
pub use traits::{fetch_fn, CacheKey, CacheStatus, FetchError, FetchFn};

#[cfg(test)]
pub use traits::testing;
