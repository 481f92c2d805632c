use crate::model::{DataItem, ItemKind};
use crate::ui::renderfns::{format_date, format_file_size, severity_color, status_color};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Read-only view of one data item
pub struct ItemDetailView {
  item: DataItem,
  scroll: u16,
}

impl ItemDetailView {
  pub fn new(item: DataItem) -> Self {
    Self { item, scroll: 0 }
  }

  fn field<'a>(label: &'a str, value: impl Into<Span<'a>>) -> Line<'a> {
    Line::from(vec![
      Span::styled(format!("{:<10}", label), Style::default().fg(Color::DarkGray)),
      value.into(),
    ])
  }

  fn header_lines(&self) -> Vec<Line<'_>> {
    let item = &self.item;
    let mut lines = vec![
      Self::field("Type:", Span::styled(item.item_type().label(), Style::default().fg(Color::Cyan))),
      Self::field("Created:", Span::raw(format_date(&item.created_at))),
    ];

    match &item.kind {
      ItemKind::Issue { severity, status } => {
        lines.push(Self::field(
          "Severity:",
          Span::styled(severity.as_str(), Style::default().fg(severity_color(*severity))),
        ));
        lines.push(Self::field(
          "Status:",
          Span::styled(status.as_str(), Style::default().fg(status_color(*status))),
        ));
      }
      ItemKind::Product {
        price,
        affiliate_link,
      } => {
        let price = price.map(|p| format!("${:.2}", p)).unwrap_or_else(|| "-".to_string());
        lines.push(Self::field("Price:", Span::styled(price, Style::default().fg(Color::Yellow))));
        if let Some(link) = affiliate_link {
          lines.push(Self::field("Link:", Span::raw(link.as_str())));
        }
      }
      ItemKind::Context { .. } | ItemKind::Inquiry { .. } => {}
    }

    if let Some(name) = &item.file_name {
      let size = item.file_size.map(format_file_size).unwrap_or_default();
      lines.push(Self::field("File:", Span::raw(format!("{} {}", name, size))));
    }
    if !item.tags.is_empty() {
      let tags = item.tags.iter().map(|t| format!("#{}", t)).collect::<Vec<_>>().join(" ");
      lines.push(Self::field("Tags:", Span::styled(tags, Style::default().fg(Color::Magenta))));
    }
    lines
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" {} ", self.item.title))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let header = self.header_lines();
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(header.len() as u16),
        Constraint::Length(1),
        Constraint::Min(1),
      ])
      .split(inner);

    frame.render_widget(Paragraph::new(header), chunks[0]);

    let sep = Paragraph::new("─".repeat(chunks[1].width as usize))
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(sep, chunks[1]);

    let mut body = String::new();
    if let Some(description) = &self.item.description {
      body.push_str(description);
    }
    if let Some(content) = self.item.content() {
      if !body.is_empty() {
        body.push_str("\n\n");
      }
      body.push_str(content);
    }
    if body.is_empty() {
      body.push_str("No description");
    }

    let para = Paragraph::new(body)
      .wrap(Wrap { trim: false })
      .scroll((self.scroll, 0));
    frame.render_widget(para, chunks[2]);
  }
}

impl View for ItemDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.scroll = self.scroll.saturating_add(1);
        ViewAction::None
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.scroll = self.scroll.saturating_sub(1);
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.item.title.clone()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("j/k", "scroll").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}
