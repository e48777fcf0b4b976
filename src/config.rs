use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{RetryPolicy, StalenessPolicy};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  pub pagination: PaginationConfig,
  pub cache: CacheConfig,
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Root of the listing API (e.g., "https://jsonplaceholder.typicode.com")
  pub base_url: String,
  /// Listing resource under the base URL
  pub resource: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: "https://jsonplaceholder.typicode.com".to_string(),
      resource: "posts".to_string(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
  pub max_page: u32,
  pub page_size: u32,
}

impl Default for PaginationConfig {
  fn default() -> Self {
    Self {
      max_page: 10,
      page_size: 10,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Age after which cached pages are revalidated in the background
  pub stale_time_ms: u64,
  /// Retries after a failed fetch (0 disables retrying)
  pub retry_attempts: u32,
  /// Delay before the first retry; doubles for each following one
  pub retry_delay_ms: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_time_ms: 2000,
      retry_attempts: 3,
      retry_delay_ms: 1000,
    }
  }
}

impl CacheConfig {
  pub fn staleness(&self) -> StalenessPolicy {
    StalenessPolicy::from_millis(self.stale_time_ms)
  }

  pub fn retry(&self) -> RetryPolicy {
    RetryPolicy {
      attempts: self.retry_attempts,
      base_delay: Duration::from_millis(self.retry_delay_ms),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Default filter directive; RUST_LOG takes precedence
  pub level: String,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./postpager.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/postpager/config.yaml
  ///
  /// Built-in defaults are used when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Config::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("postpager.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("postpager").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  pub fn validate(&self) -> Result<()> {
    if self.pagination.max_page < 1 {
      return Err(eyre!("pagination.max_page must be at least 1"));
    }
    if self.pagination.page_size < 1 {
      return Err(eyre!("pagination.page_size must be at least 1"));
    }
    if self.api.resource.trim().is_empty() {
      return Err(eyre!("api.resource must not be empty"));
    }
    Ok(())
  }

  /// Directory for log files.
  pub fn log_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("postpager").join("logs"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.pagination.max_page, 10);
    assert_eq!(config.pagination.page_size, 10);
    assert_eq!(config.cache.stale_time_ms, 2000);
    assert_eq!(config.api.resource, "posts");
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_partial_file_keeps_defaults() {
    let config = Config::parse(
      r#"
pagination:
  max_page: 5
cache:
  stale_time_ms: 500
  retry_attempts: 0
"#,
    )
    .unwrap();

    assert_eq!(config.pagination.max_page, 5);
    assert_eq!(config.pagination.page_size, 10);
    assert_eq!(config.cache.stale_time_ms, 500);
    assert_eq!(config.cache.retry().attempts, 0);
    assert_eq!(config.api.base_url, "https://jsonplaceholder.typicode.com");
    assert_eq!(config.log.level, "info");
  }

  #[test]
  fn test_empty_file() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.pagination.max_page, 10);
  }

  #[test]
  fn test_invalid_yaml() {
    assert!(Config::parse("pagination: [1, 2").is_err());
    assert!(Config::parse("pagination:\n  max_page: -1\n").is_err());
  }

  #[test]
  fn test_validate_rejects_zero_bounds() {
    let mut config = Config::default();
    config.pagination.max_page = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.pagination.page_size = 0;
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_missing_explicit_path() {
    assert!(Config::load(Some(Path::new("/nonexistent/postpager.yaml"))).is_err());
  }

  #[test]
  fn test_load_leaves_validation_to_caller() {
    let path = std::env::temp_dir().join(format!("postpager-config-{}.yaml", std::process::id()));
    std::fs::write(&path, "pagination:\n  max_page: 0\n").unwrap();

    let loaded = Config::load(Some(&path));
    std::fs::remove_file(&path).unwrap();

    // A bad file value can still be overridden before validating.
    let mut config = loaded.unwrap();
    assert_eq!(config.pagination.max_page, 0);
    assert!(config.validate().is_err());
    config.pagination.max_page = 5;
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_cache_policies() {
    let cache = CacheConfig {
      stale_time_ms: 1500,
      retry_attempts: 2,
      retry_delay_ms: 250,
    };
    assert_eq!(
      cache.staleness().stale_time(),
      chrono::Duration::milliseconds(1500)
    );
    assert_eq!(cache.retry().attempts, 2);
    assert_eq!(cache.retry().base_delay, Duration::from_millis(250));
  }
}
