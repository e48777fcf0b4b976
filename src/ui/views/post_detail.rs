use crate::posts::types::Post;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

pub fn draw_post_detail(frame: &mut Frame, area: Rect, post: &Post) {
  let block = Block::default()
    .title(format!(" Post #{} ", post.id))
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  let mut lines = vec![Line::from(vec![
    Span::styled("Title: ", Style::default().fg(Color::DarkGray)),
    Span::styled(post.title.clone(), Style::default().bold()),
  ])];
  if let Some(user_id) = post.user_id {
    lines.push(Line::from(vec![
      Span::styled("Author: ", Style::default().fg(Color::DarkGray)),
      Span::raw(format!("user {}", user_id)),
    ]));
  }
  lines.push(Line::raw(""));
  lines.extend(post.body.lines().map(|l| Line::raw(l.to_string())));

  let paragraph = Paragraph::new(lines)
    .block(block)
    .wrap(Wrap { trim: true });
  frame.render_widget(paragraph, area);
}
