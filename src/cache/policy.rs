//! Staleness policy: decides when a cached page must be revalidated.

use chrono::{DateTime, Duration, Utc};

use super::traits::{CacheEntry, CacheStatus};

/// Default freshness window.
pub const DEFAULT_STALE_TIME_MS: u64 = 2000;

#[derive(Debug, Clone, Copy)]
pub struct StalenessPolicy {
  stale_time: Duration,
}

impl StalenessPolicy {
  pub fn new(stale_time: Duration) -> Self {
    Self { stale_time }
  }

  pub fn from_millis(ms: u64) -> Self {
    Self::new(Duration::milliseconds(ms.min(i64::MAX as u64) as i64))
  }

  #[cfg(test)]
  pub fn stale_time(&self) -> Duration {
    self.stale_time
  }

  /// True if the entry was never fetched or its data has reached the stale window.
  pub fn is_stale<T>(&self, entry: &CacheEntry<T>, now: DateTime<Utc>) -> bool {
    match entry.fetched_at {
      Some(fetched_at) => now - fetched_at >= self.stale_time,
      None => true,
    }
  }

  /// Whether reading `entry` at `now` should start a background request.
  ///
  /// Failed keys wait one stale window after the failure before they are
  /// retried, so a persistently failing page is not refetched on every read.
  pub fn needs_revalidation<T>(&self, entry: &CacheEntry<T>, now: DateTime<Utc>) -> bool {
    match entry.status {
      CacheStatus::Fetching => false,
      CacheStatus::Error => match entry.error_at {
        Some(error_at) => now - error_at >= self.stale_time,
        None => true,
      },
      _ => self.is_stale(entry, now),
    }
  }

  /// Snapshot of `entry` with `Fresh` downgraded to `Stale` when it has aged out.
  pub fn classify<T: Clone>(&self, entry: &CacheEntry<T>, now: DateTime<Utc>) -> CacheEntry<T> {
    let mut entry = entry.clone();
    if entry.status == CacheStatus::Fresh && entry.has_data() && self.is_stale(&entry, now) {
      entry.status = CacheStatus::Stale;
    }
    entry
  }
}

impl Default for StalenessPolicy {
  fn default() -> Self {
    Self::from_millis(DEFAULT_STALE_TIME_MS)
  }
}
