mod renderfns;
mod views;

use crate::app::App;
use crate::pagination::PageView;
use crate::posts::types::Post;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App, view: &PageView<Post>) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Status bar
    ])
    .split(frame.area());

  renderfns::header::draw_header(frame, chunks[0], app.api_url(), view);

  match app.selected_post() {
    Some(post) => {
      let body = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);
      views::posts::draw_post_list(frame, body[0], view, app.selected_row());
      views::post_detail::draw_post_detail(frame, body[1], post);
    }
    None => views::posts::draw_post_list(frame, chunks[1], view, app.selected_row()),
  }

  draw_status_bar(frame, chunks[2], view);
}

fn draw_status_bar(frame: &mut Frame, area: Rect, view: &PageView<Post>) {
  let (content, style) = if view.is_error {
    let message = view
      .error
      .as_ref()
      .map(|e| e.to_string())
      .unwrap_or_else(|| "unknown error".to_string());
    (format!(" Error: {}", message), Style::default().fg(Color::Red))
  } else {
    let hint = " h/l:page  j/k:nav  Enter:select  Esc:clear  q:quit";
    (hint.to_string(), Style::default().fg(Color::DarkGray))
  };

  let paragraph = Paragraph::new(content).style(style);
  frame.render_widget(paragraph, area);
}
