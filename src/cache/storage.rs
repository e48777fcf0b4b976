//! In-memory cache store keyed by page.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use super::traits::{CacheEntry, CacheKey, CacheStatus, FetchError};

/// Storage slot for one key: the visible entry plus fetch bookkeeping.
#[derive(Debug)]
struct Slot<T> {
  entry: CacheEntry<T>,
  /// Sequence number handed to the most recently started fetch
  issued_seq: u64,
  /// Sequence number of the fetch whose result is currently stored
  applied_seq: u64,
}

impl<T> Default for Slot<T> {
  fn default() -> Self {
    Self {
      entry: CacheEntry::empty(),
      issued_seq: 0,
      applied_seq: 0,
    }
  }
}

/// Process-lifetime store of page results.
///
/// Entries are created lazily and never evicted. Every write replaces a
/// whole entry under the lock, so readers never observe a partial update.
pub struct CacheStore<T> {
  slots: Mutex<HashMap<CacheKey, Slot<T>>>,
}

impl<T: Clone> CacheStore<T> {
  pub fn new() -> Self {
    Self {
      slots: Mutex::new(HashMap::new()),
    }
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Slot<T>>> {
    // Writes replace whole entries, so a poisoned map is still consistent.
    self.slots.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Snapshot of the entry for `key`, if it was ever accessed.
  pub fn get(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
    self.lock().get(key).map(|slot| slot.entry.clone())
  }

  /// Overwrite the entry for `key`.
  ///
  /// The written entry counts as the newest result, so completions of
  /// fetches started before this call are ignored. Production writes go
  /// through `begin_fetch`/`settle`; this seeds entries in tests.
  #[cfg(test)]
  pub fn put(&self, key: CacheKey, entry: CacheEntry<T>) {
    let mut slots = self.lock();
    let slot = slots.entry(key).or_default();
    slot.issued_seq += 1;
    slot.applied_seq = slot.issued_seq;
    slot.entry = entry;
  }

  /// Mark `key` as fetching and return the sequence number for the new fetch.
  pub fn begin_fetch(&self, key: &CacheKey) -> u64 {
    let mut slots = self.lock();
    let slot = slots.entry(key.clone()).or_default();
    slot.issued_seq += 1;
    slot.entry.status = CacheStatus::Fetching;
    slot.entry.last_error = None;
    slot.issued_seq
  }

  /// Apply the outcome of fetch `seq`.
  ///
  /// Returns the updated entry, or `None` when a newer fetch already
  /// stored its result for this key.
  pub fn settle(
    &self,
    key: &CacheKey,
    seq: u64,
    outcome: &Result<Vec<T>, FetchError>,
    now: DateTime<Utc>,
  ) -> Option<CacheEntry<T>> {
    let mut slots = self.lock();
    let slot = slots.entry(key.clone()).or_default();

    if seq <= slot.applied_seq {
      debug!(%key, seq, applied = slot.applied_seq, "ignoring out-of-date fetch result");
      return None;
    }
    slot.applied_seq = seq;

    let previous = &slot.entry;
    let entry = match outcome {
      Ok(data) => CacheEntry {
        data: Some(Arc::new(data.clone())),
        fetched_at: Some(now),
        status: CacheStatus::Fresh,
        last_error: None,
        error_at: None,
      },
      Err(error) => CacheEntry {
        data: previous.data.clone(),
        fetched_at: previous.fetched_at,
        status: CacheStatus::Error,
        last_error: Some(error.clone()),
        error_at: Some(now),
      },
    };

    // A newer fetch may still be running; keep reporting it as in flight.
    let mut stored = entry.clone();
    if slot.issued_seq > seq {
      stored.status = CacheStatus::Fetching;
      stored.last_error = None;
    }
    slot.entry = stored;

    Some(entry)
  }

  /// Number of keys ever accessed.
  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.lock().len()
  }
}

impl<T: Clone> Default for CacheStore<T> {
  fn default() -> Self {
    Self::new()
  }
}
