//! Pagination controller: owns the current page and exposes what the UI
//! should render for it.

use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::{CacheKey, CacheLayer, CacheStatus, FetchError, FetchFn, Prefetcher};

/// Everything the UI needs to render the current page.
#[derive(Debug, Clone)]
pub struct PageView<T> {
  /// Data for the current page, or the previous page's data while it loads
  pub data: Option<Arc<Vec<T>>>,
  /// No data of any kind is available yet
  pub is_loading: bool,
  /// A request for the current page is outstanding
  pub is_fetching: bool,
  /// The current page failed and has no data of its own
  pub is_error: bool,
  pub error: Option<FetchError>,
  /// `data` belongs to a previously shown page
  pub is_previous_data: bool,
  pub current_page: u32,
  pub max_page: u32,
}

impl<T> PageView<T> {
  pub fn has_previous(&self) -> bool {
    self.current_page > 1
  }

  pub fn has_next(&self) -> bool {
    self.current_page < self.max_page
  }
}

/// Page state owned by the controller.
#[derive(Debug, Clone)]
pub struct PaginationState<T> {
  pub current_page: u32,
  pub selected_item: Option<T>,
}

pub struct PaginationController<T> {
  /// Key of page 1; other pages derive from it
  base_key: CacheKey,
  max_page: u32,
  state: PaginationState<T>,
  cache: CacheLayer<T>,
  prefetcher: Prefetcher<T>,
  fetcher: FetchFn<T>,
  /// Last data rendered for any page, shown while a new page has none
  last_rendered: Option<Arc<Vec<T>>>,
  /// Page whose successor has already been prefetched
  prefetched_for: Option<u32>,
}

impl<T> PaginationController<T>
where
  T: Clone + Send + Sync + 'static,
{
  /// Create a controller starting at page 1.
  ///
  /// `max_page` is clamped to at least 1.
  pub fn new(
    resource: impl Into<String>,
    max_page: u32,
    cache: CacheLayer<T>,
    fetcher: FetchFn<T>,
  ) -> Self {
    let max_page = max_page.max(1);
    Self {
      base_key: CacheKey::new(resource, 1),
      max_page,
      state: PaginationState {
        current_page: 1,
        selected_item: None,
      },
      prefetcher: Prefetcher::new(cache.clone(), max_page),
      cache,
      fetcher,
      last_rendered: None,
      prefetched_for: None,
    }
  }

  pub fn current_page(&self) -> u32 {
    self.state.current_page
  }

  fn key(&self, page: u32) -> CacheKey {
    self.base_key.with_page(page)
  }

  /// Navigate to `target`. Returns false (and changes nothing) when the
  /// target is outside `1..=max_page`.
  pub fn go_to_page(&mut self, target: u32) -> bool {
    if target < 1 || target > self.max_page {
      debug!(target, max_page = self.max_page, "page out of range");
      return false;
    }
    if target == self.state.current_page {
      return true;
    }

    info!(from = self.state.current_page, to = target, "changing page");
    self.state.current_page = target;
    self.cache.mount(&self.key(target), &self.fetcher);
    self.prefetch_next();
    true
  }

  pub fn next_page(&mut self) -> bool {
    self.go_to_page(self.state.current_page.saturating_add(1))
  }

  pub fn previous_page(&mut self) -> bool {
    self.go_to_page(self.state.current_page.saturating_sub(1))
  }

  /// Prefetch the page after the current one, once per page change.
  fn prefetch_next(&mut self) {
    let current = self.state.current_page;
    if self.prefetched_for == Some(current) {
      return;
    }
    self.prefetched_for = Some(current);

    if current < self.max_page {
      self.prefetcher.prefetch(&self.key(current + 1), &self.fetcher);
    }
  }

  /// Read the current page through the cache.
  ///
  /// Never blocks: stale data is served while it revalidates, and a page
  /// without data falls back to whatever was rendered last.
  pub fn read(&mut self) -> PageView<T> {
    let key = self.key(self.state.current_page);
    let entry = self.cache.read(&key, &self.fetcher);
    self.prefetch_next();

    let is_fetching = self.cache.is_in_flight(&key);
    let is_error = entry.status == CacheStatus::Error && !entry.has_data();

    let (data, is_previous_data) = match entry.data {
      Some(data) => {
        self.last_rendered = Some(Arc::clone(&data));
        (Some(data), false)
      }
      None => match &self.last_rendered {
        Some(previous) => (Some(Arc::clone(previous)), true),
        None => (None, false),
      },
    };

    PageView {
      is_loading: data.is_none() && !is_error,
      data,
      is_fetching,
      is_error,
      error: if is_error { entry.last_error } else { None },
      is_previous_data,
      current_page: self.state.current_page,
      max_page: self.max_page,
    }
  }

  pub fn select(&mut self, item: T) {
    self.state.selected_item = Some(item);
  }

  pub fn clear_selection(&mut self) {
    self.state.selected_item = None;
  }

  pub fn selected(&self) -> Option<&T> {
    self.state.selected_item.as_ref()
  }
}
