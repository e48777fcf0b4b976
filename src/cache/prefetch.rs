//! Best-effort cache warming for pages the user is likely to open next.

use tracing::debug;

use super::layer::CacheLayer;
use super::traits::{CacheKey, FetchFn};

pub struct Prefetcher<T> {
  cache: CacheLayer<T>,
  max_page: u32,
}

impl<T> Prefetcher<T>
where
  T: Clone + Send + Sync + 'static,
{
  pub fn new(cache: CacheLayer<T>, max_page: u32) -> Self {
    Self { cache, max_page }
  }

  /// Start a background fetch for `key` unless it is out of range, fresh,
  /// or already in flight. Returns whether a request was issued.
  ///
  /// Failures are logged and otherwise ignored.
  pub fn prefetch(&self, key: &CacheKey, fetcher: &FetchFn<T>) -> bool {
    if key.page < 1 || key.page > self.max_page {
      return false;
    }
    if self.cache.is_in_flight(key) || self.cache.is_fresh(key) {
      debug!(%key, "prefetch skipped");
      return false;
    }

    debug!(%key, "prefetching");
    let fetch = self.cache.request(key, fetcher);
    let key = key.clone();
    tokio::spawn(async move {
      if let Err(error) = fetch.await {
        debug!(%key, %error, "prefetch failed");
      }
    });
    true
  }
}
