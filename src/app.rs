use crate::cache::CacheLayer;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::pagination::{PageView, PaginationController};
use crate::posts::client::PostsClient;
use crate::posts::types::Post;
use crate::ui;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::info;

/// Main application state
pub struct App {
  /// Page navigation and cached page reads
  controller: PaginationController<Post>,

  /// Highlighted row in the current page
  selected: usize,

  /// API root shown in the header
  api_url: String,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: &Config) -> Result<Self> {
    let client = PostsClient::new(&config.api, config.pagination.page_size)?;
    let cache = CacheLayer::new(config.cache.staleness(), config.cache.retry());
    let controller = PaginationController::new(
      config.api.resource.clone(),
      config.pagination.max_page,
      cache,
      client.fetcher(),
    );

    Ok(Self {
      controller,
      selected: 0,
      api_url: config.api.base_url.clone(),
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.event_loop(&mut terminal).await;

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
    let mut events = EventHandler::new(Duration::from_millis(250));
    info!(page = self.controller.current_page(), "starting");

    while !self.should_quit {
      let view = self.controller.read();
      terminal.draw(|frame| ui::draw(frame, self, &view))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key, &view),
        Some(Event::Resize) | Some(Event::Tick) => {}
        None => break,
      }
    }

    Ok(())
  }

  fn handle_key(&mut self, key: KeyEvent, view: &PageView<Post>) {
    match key.code {
      KeyCode::Char('q') => self.should_quit = true,
      KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.should_quit = true;
      }

      // Pages
      KeyCode::Left | KeyCode::Char('h') => {
        if self.controller.previous_page() {
          self.selected = 0;
        }
      }
      KeyCode::Right | KeyCode::Char('l') => {
        if self.controller.next_page() {
          self.selected = 0;
        }
      }

      // Rows
      KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1, view),
      KeyCode::Down | KeyCode::Char('j') => self.move_selection(1, view),
      KeyCode::Enter => {
        let post = view
          .data
          .as_ref()
          .and_then(|posts| posts.get(self.selected))
          .cloned();
        if let Some(post) = post {
          self.controller.select(post);
        }
      }
      KeyCode::Esc => self.controller.clear_selection(),

      _ => {}
    }
  }

  fn move_selection(&mut self, delta: i32, view: &PageView<Post>) {
    let len = view.data.as_ref().map_or(0, |posts| posts.len());
    if len > 0 {
      self.selected = (self.selected as i32 + delta).rem_euclid(len as i32) as usize;
    }
  }

  // Accessors for UI rendering
  pub fn selected_row(&self) -> usize {
    self.selected
  }

  pub fn selected_post(&self) -> Option<&Post> {
    self.controller.selected()
  }

  pub fn api_url(&self) -> &str {
    &self.api_url
  }
}
