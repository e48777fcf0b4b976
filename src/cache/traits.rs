//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Identifies one page of one resource (e.g. `posts:3`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
  pub resource: String,
  pub page: u32,
}

impl CacheKey {
  pub fn new(resource: impl Into<String>, page: u32) -> Self {
    Self {
      resource: resource.into(),
      page,
    }
  }

  /// Key for another page of the same resource.
  pub fn with_page(&self, page: u32) -> Self {
    Self {
      resource: self.resource.clone(),
      page,
    }
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.resource, self.page)
  }
}

/// Lifecycle status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheStatus {
  /// Never fetched
  #[default]
  Empty,
  /// A request is outstanding
  Fetching,
  /// Fetched successfully and within the stale window
  Fresh,
  /// Has data, but older than the stale window
  Stale,
  /// Last request failed
  Error,
}

/// Failure of a page fetch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
  /// Transport-level failure or non-success HTTP status
  #[error("network failure: {0}")]
  Network(String),
  /// Payload could not be decoded
  #[error("decode failure: {0}")]
  Decode(String),
}

/// Cached state for a single key.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
  /// Last successfully fetched page
  pub data: Option<Arc<Vec<T>>>,
  /// When `data` was fetched
  pub fetched_at: Option<DateTime<Utc>>,
  pub status: CacheStatus,
  /// Only set while `status` is `Error`
  pub last_error: Option<FetchError>,
  /// When the last failure was recorded
  pub error_at: Option<DateTime<Utc>>,
}

impl<T> CacheEntry<T> {
  pub fn empty() -> Self {
    Self {
      data: None,
      fetched_at: None,
      status: CacheStatus::Empty,
      last_error: None,
      error_at: None,
    }
  }

  pub fn has_data(&self) -> bool {
    self.data.is_some()
  }
}

impl<T> Default for CacheEntry<T> {
  fn default() -> Self {
    Self::empty()
  }
}

/// A factory that fetches the page identified by a key.
pub type FetchFn<T> = Arc<dyn Fn(CacheKey) -> BoxFuture<'static, Result<Vec<T>, FetchError>> + Send + Sync>;

/// Wrap an async closure as a [`FetchFn`].
pub fn fetch_fn<T, F, Fut>(fetcher: F) -> FetchFn<T>
where
  T: 'static,
  F: Fn(CacheKey) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Vec<T>, FetchError>> + Send + 'static,
{
  Arc::new(move |key| fetcher(key).boxed())
}

/// Source of the current time for staleness decisions.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

#[cfg(test)]
pub mod testing {
  use super::*;
  use std::collections::HashMap;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Mutex;
  use tokio::sync::Semaphore;

  /// Clock that only moves when told to.
  pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
  }

  impl ManualClock {
    pub fn new() -> Arc<Self> {
      Arc::new(Self {
        now: Mutex::new(Utc::now()),
      })
    }

    pub fn advance_ms(&self, ms: i64) {
      let mut now = self.now.lock().unwrap();
      *now += chrono::Duration::milliseconds(ms);
    }
  }

  impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
      *self.now.lock().unwrap()
    }
  }

  /// Fake page source that counts calls per page.
  ///
  /// Page `n` resolves to `[n * 100, n * 100 + 1]` tagged with the call
  /// number, so refetched data can be told apart from the original.
  #[derive(Default)]
  pub struct FakeSource {
    calls: Mutex<HashMap<u32, usize>>,
    total: AtomicUsize,
    failing: Mutex<Vec<u32>>,
    gates: Mutex<HashMap<u32, Arc<Semaphore>>>,
  }

  impl FakeSource {
    pub fn new() -> Arc<Self> {
      Arc::new(Self::default())
    }

    pub fn fail_page(&self, page: u32) {
      self.failing.lock().unwrap().push(page);
    }

    pub fn recover_page(&self, page: u32) {
      self.failing.lock().unwrap().retain(|p| *p != page);
    }

    /// Hold fetches of `page` until [`FakeSource::release`] is called.
    pub fn gate_page(&self, page: u32) {
      self
        .gates
        .lock()
        .unwrap()
        .insert(page, Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, page: u32) {
      if let Some(gate) = self.gates.lock().unwrap().get(&page) {
        gate.add_permits(1);
      }
    }

    pub fn calls(&self, page: u32) -> usize {
      self.calls.lock().unwrap().get(&page).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
      self.total.load(Ordering::SeqCst)
    }

    pub fn fetcher(self: &Arc<Self>) -> FetchFn<u32> {
      let source = Arc::clone(self);
      fetch_fn(move |key: CacheKey| {
        let source = Arc::clone(&source);
        async move { source.fetch(key).await }
      })
    }

    async fn fetch(&self, key: CacheKey) -> Result<Vec<u32>, FetchError> {
      let call = {
        let mut calls = self.calls.lock().unwrap();
        let count = calls.entry(key.page).or_insert(0);
        *count += 1;
        *count as u32
      };
      self.total.fetch_add(1, Ordering::SeqCst);

      let gate = self.gates.lock().unwrap().get(&key.page).cloned();
      if let Some(gate) = gate {
        gate.acquire().await.unwrap().forget();
      }

      if self.failing.lock().unwrap().contains(&key.page) {
        return Err(FetchError::Network(format!("page {} unavailable", key.page)));
      }
      Ok(vec![key.page * 100, key.page * 100 + call])
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn test_cache_key_display() {
    assert_eq!(CacheKey::new("posts", 3).to_string(), "posts:3");
  }

  #[test]
  fn test_cache_key_identity() {
    let mut keys = HashSet::new();
    keys.insert(CacheKey::new("posts", 1));
    keys.insert(CacheKey::new("posts", 1));
    keys.insert(CacheKey::new("posts", 2));
    keys.insert(CacheKey::new("users", 1));
    assert_eq!(keys.len(), 3);
    assert_eq!(CacheKey::new("posts", 1).with_page(2), CacheKey::new("posts", 2));
  }

  #[test]
  fn test_empty_entry() {
    let entry: CacheEntry<u32> = CacheEntry::default();
    assert_eq!(entry.status, CacheStatus::Empty);
    assert!(!entry.has_data());
    assert!(entry.fetched_at.is_none());
  }

  #[test]
  fn test_fetch_error_messages() {
    assert_eq!(
      FetchError::Network("timed out".to_string()).to_string(),
      "network failure: timed out"
    );
    assert_eq!(
      FetchError::Decode("expected array".to_string()).to_string(),
      "decode failure: expected array"
    );
  }
}
