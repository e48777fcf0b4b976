use crate::pagination::PageView;
use crate::posts::types::Post;
use crate::ui::renderfns::utils::truncate;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

pub fn draw_post_list(frame: &mut Frame, area: Rect, view: &PageView<Post>, selected: usize) {
  let title = if view.is_loading {
    " Posts (loading...) ".to_string()
  } else if view.is_previous_data {
    format!(" Posts [page {}] (showing previous page) ", view.current_page)
  } else {
    let count = view.data.as_ref().map_or(0, |posts| posts.len());
    format!(" Posts [page {}] ({}) ", view.current_page, count)
  };

  let border = if view.is_error { Color::Red } else { Color::Blue };
  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(border));

  let posts = match &view.data {
    Some(posts) if !posts.is_empty() => posts,
    _ => {
      let content = if view.is_loading {
        "Loading..."
      } else if let Some(error) = &view.error {
        return render_message(frame, area, block, &format!("Error: {}", error), Color::Red);
      } else {
        "No posts on this page."
      };
      return render_message(frame, area, block, content, Color::DarkGray);
    }
  };

  // Dim rows that belong to the page being replaced
  let text_style = if view.is_previous_data {
    Style::default().fg(Color::DarkGray)
  } else {
    Style::default()
  };

  let items: Vec<ListItem> = posts
    .iter()
    .map(|post| {
      let line = Line::from(vec![
        Span::styled(format!("{:>4}", post.id), Style::default().fg(Color::Cyan)),
        Span::raw("  "),
        Span::styled(truncate(&post.title, 70), text_style),
      ]);
      ListItem::new(line)
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

  let mut state = ListState::default();
  state.select(Some(selected.min(posts.len() - 1)));

  frame.render_stateful_widget(list, area, &mut state);
}

fn render_message(frame: &mut Frame, area: Rect, block: Block, content: &str, color: Color) {
  let paragraph = Paragraph::new(content.to_string())
    .block(block)
    .style(Style::default().fg(color));
  frame.render_widget(paragraph, area);
}
