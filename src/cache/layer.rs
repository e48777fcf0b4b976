//! Cache layer that orchestrates staleness checks with network fetching.

use std::sync::Arc;
use tracing::debug;

use super::executor::{PendingFetch, QueryExecutor, RetryPolicy};
use super::policy::StalenessPolicy;
use super::storage::CacheStore;
use super::traits::{CacheEntry, CacheKey, CacheStatus, Clock, FetchFn, SystemClock};

/// Cache layer that serves cached pages and revalidates them in the background.
///
/// Cloning is cheap; all clones share one store and one set of in-flight
/// requests.
pub struct CacheLayer<T> {
  store: Arc<CacheStore<T>>,
  executor: QueryExecutor<T>,
  policy: StalenessPolicy,
  clock: Arc<dyn Clock>,
}

impl<T> CacheLayer<T>
where
  T: Clone + Send + Sync + 'static,
{
  /// Create a cache layer on the system clock.
  pub fn new(policy: StalenessPolicy, retry: RetryPolicy) -> Self {
    Self::with_clock(policy, retry, Arc::new(SystemClock))
  }

  pub fn with_clock(policy: StalenessPolicy, retry: RetryPolicy, clock: Arc<dyn Clock>) -> Self {
    let store = Arc::new(CacheStore::new());
    let executor = QueryExecutor::new(Arc::clone(&store), Arc::clone(&clock), retry);
    Self {
      store,
      executor,
      policy,
      clock,
    }
  }

  /// Read the page for `key` without blocking.
  ///
  /// 1. Fresh - return it, no network call
  /// 2. Stale - return the cached data marked `Stale` and revalidate in the background
  /// 3. Missing - start a request and return the `Fetching` entry
  pub fn read(&self, key: &CacheKey, fetcher: &FetchFn<T>) -> CacheEntry<T> {
    let now = self.clock.now();

    let Some(entry) = self.store.get(key) else {
      debug!(%key, "cache miss");
      self.executor.request(key, fetcher);
      return self.store.get(key).unwrap_or_default();
    };

    if !self.policy.needs_revalidation(&entry, now) {
      return self.policy.classify(&entry, now);
    }

    if entry.has_data() {
      debug!(%key, "serving stale data, revalidating");
      let mut snapshot = entry;
      snapshot.status = CacheStatus::Stale;
      snapshot.last_error = None;
      self.executor.request(key, fetcher);
      snapshot
    } else {
      debug!(%key, status = ?entry.status, "no cached data, fetching");
      self.executor.request(key, fetcher);
      self.store.get(key).unwrap_or(entry)
    }
  }

  /// Read `key` as it becomes the page on screen.
  ///
  /// A key whose last fetch failed is refetched right away instead of
  /// waiting out its error window, so a failure recorded in the background
  /// (a prefetch, say) is retried before it is ever shown.
  pub fn mount(&self, key: &CacheKey, fetcher: &FetchFn<T>) -> CacheEntry<T> {
    if self
      .store
      .get(key)
      .is_some_and(|entry| entry.status == CacheStatus::Error)
    {
      debug!(%key, "refetching failed key on mount");
      self.executor.request(key, fetcher);
    }
    self.read(key, fetcher)
  }

  /// Start (or join) a request for `key` regardless of freshness.
  pub fn request(&self, key: &CacheKey, fetcher: &FetchFn<T>) -> PendingFetch<T> {
    self.executor.request(key, fetcher)
  }

  /// Current entry for `key` without triggering any fetch.
  #[cfg(test)]
  pub fn peek(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
    self
      .store
      .get(key)
      .map(|entry| self.policy.classify(&entry, self.clock.now()))
  }

  /// True if `key` holds data that is still inside the stale window.
  pub fn is_fresh(&self, key: &CacheKey) -> bool {
    self
      .store
      .get(key)
      .is_some_and(|entry| entry.has_data() && !self.policy.is_stale(&entry, self.clock.now()))
  }

  #[cfg(test)]
  pub fn in_flight(&self, key: &CacheKey) -> Option<PendingFetch<T>> {
    self.executor.in_flight(key)
  }

  pub fn is_in_flight(&self, key: &CacheKey) -> bool {
    self.executor.is_in_flight(key)
  }
}

impl<T> Clone for CacheLayer<T> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      executor: self.executor.clone(),
      policy: self.policy,
      clock: Arc::clone(&self.clock),
    }
  }
}
