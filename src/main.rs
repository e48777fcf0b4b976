mod app;
mod cache;
mod config;
mod event;
mod pagination;
mod posts;
mod ui;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "postpager")]
#[command(about = "Browse a paginated posts API with a stale-while-revalidate cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/postpager/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Last page that can be navigated to
  #[arg(long)]
  max_page: Option<u32>,

  /// Posts per page
  #[arg(long)]
  page_size: Option<u32>,
}

/// Log to a daily file; the terminal belongs to the UI.
fn init_logging(config: &config::Config) -> Result<WorkerGuard> {
  let log_dir = config::Config::log_dir()?;
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(&log_dir, "postpager.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Command line overrides
  if let Some(max_page) = args.max_page {
    config.pagination.max_page = max_page;
  }
  if let Some(page_size) = args.page_size {
    config.pagination.page_size = page_size;
  }
  config.validate()?;

  let _guard = init_logging(&config)?;
  tracing::info!(
    api = %config.api.base_url,
    resource = %config.api.resource,
    max_page = config.pagination.max_page,
    stale_time_ms = config.cache.stale_time_ms,
    "postpager starting"
  );

  // Initialize and run the app
  let mut app = app::App::new(&config)?;
  app.run().await?;

  Ok(())
}
