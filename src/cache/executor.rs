//! Query executor: runs fetches, records their outcome, and deduplicates
//! concurrent requests for the same key.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

use super::storage::CacheStore;
use super::traits::{CacheEntry, CacheKey, Clock, FetchError, FetchFn};

/// Handle to a request in flight. Cloning it attaches another waiter to
/// the same underlying fetch.
pub type PendingFetch<T> = Shared<BoxFuture<'static, Result<CacheEntry<T>, FetchError>>>;

/// Upper bound on the delay between retries.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// How failed fetches are retried before the failure is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Extra attempts after the first failure
  pub attempts: u32,
  /// Delay before the first retry; doubled for each following one
  pub base_delay: Duration,
}

impl RetryPolicy {
  pub fn none() -> Self {
    Self {
      attempts: 0,
      base_delay: Duration::ZERO,
    }
  }

  /// Delay before retry number `retry` (0-based).
  pub fn delay(&self, retry: u32) -> Duration {
    let factor = 2u32.saturating_pow(retry);
    self
      .base_delay
      .checked_mul(factor)
      .unwrap_or(MAX_RETRY_DELAY)
      .min(MAX_RETRY_DELAY)
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      attempts: 3,
      base_delay: Duration::from_millis(1000),
    }
  }
}

/// A request in flight for one key.
struct InFlight<T> {
  seq: u64,
  fetch: PendingFetch<T>,
}

type PendingMap<T> = Arc<Mutex<HashMap<CacheKey, InFlight<T>>>>;

/// Runs fetches against the shared [`CacheStore`].
///
/// All store mutations happen here, inside the request lifecycle.
pub struct QueryExecutor<T> {
  store: Arc<CacheStore<T>>,
  pending: PendingMap<T>,
  clock: Arc<dyn Clock>,
  retry: RetryPolicy,
}

impl<T> QueryExecutor<T>
where
  T: Clone + Send + Sync + 'static,
{
  pub fn new(store: Arc<CacheStore<T>>, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
    Self {
      store,
      pending: Arc::new(Mutex::new(HashMap::new())),
      clock,
      retry,
    }
  }

  fn lock_pending(&self) -> MutexGuard<'_, HashMap<CacheKey, InFlight<T>>> {
    self.pending.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Request the page for `key`.
  ///
  /// Joins the pending request if one exists. Otherwise marks the entry as
  /// fetching and spawns the fetch, which runs to completion even if every
  /// returned handle is dropped. Must be called from within a Tokio runtime.
  pub fn request(&self, key: &CacheKey, fetcher: &FetchFn<T>) -> PendingFetch<T> {
    let mut pending = self.lock_pending();

    if let Some(in_flight) = pending.get(key) {
      debug!(%key, seq = in_flight.seq, "joining in-flight request");
      return in_flight.fetch.clone();
    }

    let seq = self.store.begin_fetch(key);
    debug!(%key, seq, "starting fetch");

    let fetch = run_fetch(
      key.clone(),
      seq,
      Arc::clone(fetcher),
      Arc::clone(&self.store),
      Arc::clone(&self.pending),
      Arc::clone(&self.clock),
      self.retry,
    )
    .boxed()
    .shared();

    pending.insert(
      key.clone(),
      InFlight {
        seq,
        fetch: fetch.clone(),
      },
    );
    drop(pending);

    tokio::spawn(fetch.clone().map(|_| ()));
    fetch
  }

  /// The pending request for `key`, if any.
  #[cfg(test)]
  pub fn in_flight(&self, key: &CacheKey) -> Option<PendingFetch<T>> {
    self.lock_pending().get(key).map(|f| f.fetch.clone())
  }

  pub fn is_in_flight(&self, key: &CacheKey) -> bool {
    self.lock_pending().contains_key(key)
  }
}

impl<T> Clone for QueryExecutor<T> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      pending: Arc::clone(&self.pending),
      clock: Arc::clone(&self.clock),
      retry: self.retry,
    }
  }
}

/// Body of one request: fetch with retries, store the outcome, release the slot.
async fn run_fetch<T>(
  key: CacheKey,
  seq: u64,
  fetcher: FetchFn<T>,
  store: Arc<CacheStore<T>>,
  pending: PendingMap<T>,
  clock: Arc<dyn Clock>,
  retry: RetryPolicy,
) -> Result<CacheEntry<T>, FetchError>
where
  T: Clone + Send + Sync + 'static,
{
  let mut retries = 0;
  let outcome = loop {
    match fetcher(key.clone()).await {
      Ok(data) => break Ok(data),
      Err(error) if retries < retry.attempts => {
        let delay = retry.delay(retries);
        warn!(%key, %error, retry = retries + 1, ?delay, "fetch failed, retrying");
        retries += 1;
        tokio::time::sleep(delay).await;
      }
      Err(error) => break Err(error),
    }
  };

  let applied = store.settle(&key, seq, &outcome, clock.now());

  {
    let mut pending = pending.lock().unwrap_or_else(|e| e.into_inner());
    if pending.get(&key).is_some_and(|f| f.seq == seq) {
      pending.remove(&key);
    }
  }

  match outcome {
    Ok(_) => {
      debug!(%key, seq, "fetch succeeded");
      // A newer result already landed; report what is actually cached.
      Ok(applied.or_else(|| store.get(&key)).unwrap_or_default())
    }
    Err(error) => {
      warn!(%key, seq, %error, "fetch failed");
      Err(error)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::traits::testing::{FakeSource, ManualClock};
  use crate::cache::traits::CacheStatus;
  use futures::future::join_all;

  fn executor(retry: RetryPolicy) -> (QueryExecutor<u32>, Arc<CacheStore<u32>>) {
    let store = Arc::new(CacheStore::new());
    let executor = QueryExecutor::new(Arc::clone(&store), ManualClock::new(), retry);
    (executor, store)
  }

  fn key(page: u32) -> CacheKey {
    CacheKey::new("posts", page)
  }

  #[tokio::test]
  async fn test_request_success_updates_store() {
    let (executor, store) = executor(RetryPolicy::none());
    let source = FakeSource::new();

    let entry = executor.request(&key(1), &source.fetcher()).await.unwrap();

    assert_eq!(entry.status, CacheStatus::Fresh);
    assert_eq!(entry.data.as_deref(), Some(&vec![100, 101]));
    assert!(entry.fetched_at.is_some());
    assert_eq!(store.get(&key(1)).unwrap().status, CacheStatus::Fresh);
    assert!(!executor.is_in_flight(&key(1)));
  }

  #[tokio::test]
  async fn test_concurrent_requests_share_one_fetch() {
    let (executor, _store) = executor(RetryPolicy::none());
    let source = FakeSource::new();
    source.gate_page(1);
    let fetcher = source.fetcher();

    let handles: Vec<_> = (0..5).map(|_| executor.request(&key(1), &fetcher)).collect();
    assert!(executor.is_in_flight(&key(1)));

    source.release(1);
    let results = join_all(handles).await;

    assert_eq!(source.calls(1), 1);
    for result in results {
      assert_eq!(result.unwrap().data.as_deref(), Some(&vec![100, 101]));
    }
  }

  #[tokio::test]
  async fn test_failure_rejects_all_waiters_and_keeps_data() {
    let (executor, store) = executor(RetryPolicy::none());
    let source = FakeSource::new();
    let fetcher = source.fetcher();
    executor.request(&key(1), &fetcher).await.unwrap();

    source.fail_page(1);
    let first = executor.request(&key(1), &fetcher);
    let second = executor.request(&key(1), &fetcher);

    assert!(matches!(first.await, Err(FetchError::Network(_))));
    assert!(matches!(second.await, Err(FetchError::Network(_))));
    assert_eq!(source.calls(1), 2);

    let entry = store.get(&key(1)).unwrap();
    assert_eq!(entry.status, CacheStatus::Error);
    assert_eq!(entry.data.as_deref(), Some(&vec![100, 101]));
    assert!(entry.last_error.is_some());
    assert!(!executor.is_in_flight(&key(1)));
  }

  #[tokio::test]
  async fn test_dropped_handle_still_completes() {
    let (executor, store) = executor(RetryPolicy::none());
    let source = FakeSource::new();
    source.gate_page(2);

    drop(executor.request(&key(2), &source.fetcher()));
    source.release(2);

    // The spawned task drives the fetch without any waiter.
    while executor.is_in_flight(&key(2)) {
      tokio::task::yield_now().await;
    }
    assert_eq!(store.get(&key(2)).unwrap().status, CacheStatus::Fresh);
  }

  #[tokio::test]
  async fn test_retry_recovers_from_transient_failure() {
    let retry = RetryPolicy {
      attempts: 2,
      base_delay: Duration::from_millis(1),
    };
    let (executor, store) = executor(retry);
    let source = FakeSource::new();
    source.fail_page(1);
    source.gate_page(1);
    let fetcher = source.fetcher();

    let fetch = executor.request(&key(1), &fetcher);
    source.release(1);
    while source.calls(1) < 1 {
      tokio::task::yield_now().await;
    }
    source.recover_page(1);
    source.release(1);

    let entry = fetch.await.unwrap();
    assert_eq!(source.calls(1), 2);
    assert_eq!(entry.status, CacheStatus::Fresh);
    assert_eq!(store.get(&key(1)).unwrap().status, CacheStatus::Fresh);
  }

  #[tokio::test]
  async fn test_retry_gives_up_after_attempts() {
    let retry = RetryPolicy {
      attempts: 2,
      base_delay: Duration::from_millis(1),
    };
    let (executor, _store) = executor(retry);
    let source = FakeSource::new();
    source.fail_page(4);

    let result = executor.request(&key(4), &source.fetcher()).await;

    assert!(result.is_err());
    assert_eq!(source.calls(4), 3);
  }

  #[test]
  fn test_retry_delay_backoff() {
    let retry = RetryPolicy::default();
    assert_eq!(retry.delay(0), Duration::from_millis(1000));
    assert_eq!(retry.delay(1), Duration::from_millis(2000));
    assert_eq!(retry.delay(2), Duration::from_millis(4000));
    assert_eq!(retry.delay(10), MAX_RETRY_DELAY);
    assert_eq!(retry.delay(40), MAX_RETRY_DELAY);
  }
}
