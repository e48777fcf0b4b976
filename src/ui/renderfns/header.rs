use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use super::utils::page_label;
use crate::pagination::PageView;
use crate::posts::types::Post;

/// Draw the header bar with logo, API host, page position and fetch state
pub fn draw_header(frame: &mut Frame, area: Rect, api_url: &str, view: &PageView<Post>) {
  let domain = extract_domain(api_url);

  let mut spans = vec![
    Span::styled(" postpager ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", domain), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", page_label(view.current_page, view.max_page)),
      Style::default().fg(Color::Yellow).bold(),
    ),
    Span::raw("  "),
    nav_span("<h>", " prev", view.has_previous()),
    Span::raw("   "),
    nav_span("<l>", " next", view.has_next()),
  ];

  if view.is_fetching {
    spans.push(Span::raw("   "));
    spans.push(Span::styled("fetching…", Style::default().fg(Color::Magenta)));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}

/// Navigation hint, dimmed when the action is unavailable
fn nav_span(key: &'static str, label: &'static str, enabled: bool) -> Span<'static> {
  if enabled {
    Span::styled(
      format!("{}{}", key, label),
      Style::default().fg(Color::Cyan),
    )
  } else {
    Span::styled(
      format!("{}{}", key, label),
      Style::default().fg(Color::DarkGray),
    )
  }
}

/// Extract domain from the API URL
fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}
