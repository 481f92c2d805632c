use crate::context::Context;
use crate::data::{filter_and_sort, ItemFilter};
use crate::error::AppError;
use crate::model::{DataItem, DataType, ItemKind, Project};
use crate::query::{Query, QueryState};
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_date, severity_color, spinner, truncate};
use crate::ui::view::{Notice, ShortcutInfo, View, ViewAction};
use crate::ui::views::ItemDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs};

/// Tab order: everything, then one tab per type
const TABS: [Option<DataType>; 5] = [
  None,
  Some(DataType::Context),
  Some(DataType::Issue),
  Some(DataType::Inquiry),
  Some(DataType::Product),
];

/// Data items of one project, or of every project ("library")
pub struct DataListView {
  ctx: Context,
  label: String,
  /// Pending slug lookup for routes that name a project
  project: Option<Query<Project>>,
  items: Option<Query<Vec<DataItem>>>,
  filter: ItemFilter,
  tab: usize,
  list_state: ListState,
  search: SearchInput,
  notice: Option<Notice>,
  frame: usize,
}

impl DataListView {
  pub fn library(ctx: Context) -> Self {
    let mut view = Self::empty(ctx, "Data Library".to_string());
    view.load_items(None);
    view
  }

  pub fn for_project(ctx: Context, project: &Project) -> Self {
    let mut view = Self::empty(ctx, project.name.clone());
    view.load_items(Some(project.id.clone()));
    view
  }

  /// Resolve the caller's project by slug first, then load its items.
  pub fn for_slug(ctx: Context, slug: &str) -> Self {
    let mut view = Self::empty(ctx, slug.to_string());

    let api = view.ctx.projects.clone();
    let user_id = view.ctx.user.as_ref().map(|u| u.id.clone());
    let slug = slug.to_string();
    let mut query = Query::new(move || {
      let api = api.clone();
      let user_id = user_id.clone();
      let slug = slug.clone();
      async move {
        let user_id = user_id.ok_or(AppError::NotAuthenticated)?;
        api.by_slug(&user_id, &slug).await
      }
    });
    query.fetch();

    view.project = Some(query);
    view
  }

  fn empty(ctx: Context, label: String) -> Self {
    Self {
      ctx,
      label,
      project: None,
      items: None,
      filter: ItemFilter::default(),
      tab: 0,
      list_state: ListState::default(),
      search: SearchInput::new(),
      notice: None,
      frame: 0,
    }
  }

  fn load_items(&mut self, project_id: Option<String>) {
    let store = self.ctx.data_items(project_id, None);
    if let Some(fetcher) = store.fetcher() {
      let mut query = Query::new(fetcher);
      query.fetch();
      self.items = Some(query);
    }
  }

  /// Start loading items once the slug lookup has succeeded.
  fn resolve_project(&mut self) {
    if self.items.is_some() {
      return;
    }
    let resolved = match self.project.as_ref().map(|q| q.state()) {
      Some(QueryState::Success(project)) => project.clone(),
      _ => return,
    };
    self.label = resolved.name;
    self.load_items(Some(resolved.id));
  }

  fn all_items(&self) -> &[DataItem] {
    self
      .items
      .as_ref()
      .and_then(|q| q.data())
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  fn visible(&self) -> Vec<DataItem> {
    filter_and_sort(self.all_items(), &self.filter)
  }

  fn is_loading(&self) -> bool {
    self.project.as_ref().is_some_and(|q| q.is_loading())
      || self.items.as_ref().is_some_and(|q| q.is_loading())
  }

  fn error(&self) -> Option<&str> {
    self
      .project
      .as_ref()
      .and_then(|q| q.error())
      .or_else(|| self.items.as_ref().and_then(|q| q.error()))
  }

  fn select_tab(&mut self, tab: usize) {
    self.tab = tab % TABS.len();
    self.filter.item_type = TABS[self.tab];
    self.list_state.select(Some(0));
  }

  fn render_tabs(&self, frame: &mut Frame, area: Rect) {
    let items = self.all_items();
    let titles: Vec<Line> = TABS
      .iter()
      .map(|tab| {
        let (label, count) = match tab {
          None => ("All", items.len()),
          Some(t) => (t.label(), items.iter().filter(|i| i.item_type() == *t).count()),
        };
        Line::from(format!(" {} ({}) ", label, count))
      })
      .collect();

    let tabs = Tabs::new(titles)
      .select(self.tab)
      .style(Style::default().fg(Color::DarkGray))
      .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
      .divider("│");
    frame.render_widget(tabs, area);
  }

  fn item_line(item: &DataItem, title_width: usize) -> Line<'static> {
    let badge = match &item.kind {
      ItemKind::Issue { severity, .. } => Span::styled(
        format!("{:<9}", severity.as_str()),
        Style::default().fg(severity_color(*severity)),
      ),
      ItemKind::Product { price: Some(p), .. } => {
        Span::styled(format!("{:<9}", format!("${:.2}", p)), Style::default().fg(Color::Yellow))
      }
      _ => Span::raw(format!("{:<9}", "")),
    };

    Line::from(vec![
      Span::styled(
        format!("{:<9}", item.item_type().as_str()),
        Style::default().fg(Color::Cyan),
      ),
      badge,
      Span::raw(format!(
        "{:<width$}",
        truncate(&item.title, title_width),
        width = title_width
      )),
      Span::raw(" "),
      Span::styled(format_date(&item.created_at), Style::default().fg(Color::DarkGray)),
    ])
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let visible = self.visible();
    ensure_valid_selection(&mut self.list_state, visible.len());

    let mut title = if self.is_loading() {
      format!(" {} (loading {}) ", self.label, spinner(self.frame))
    } else if let Some(e) = self.error() {
      format!(" {} (error: {}) ", self.label, e)
    } else {
      format!(" {} ({}) ", self.label, visible.len())
    };
    title.push_str(&format!("[{}] ", self.filter.sort.label()));
    if self.filter.is_active() {
      title.push_str(&format!("[/{}] ", self.filter.search));
    }

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if visible.is_empty() {
      let content = if self.ctx.user.is_none() {
        "Not signed in. Run `chatdeck login` first."
      } else if self.is_loading() {
        "Loading data..."
      } else if self.error().is_some() {
        "Failed to load data. Press 'r' to retry."
      } else if self.filter.is_active() {
        "No items match the search."
      } else {
        "No data items yet."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let title_width = (area.width as usize).saturating_sub(40).max(16);
    let items: Vec<ListItem> = visible
      .iter()
      .map(|item| ListItem::new(Self::item_line(item, title_width)))
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  // Key handling helpers for or_else chain pattern
  fn handle_overlays(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.search.handle_key(key) {
      KeyResult::Handled => Some(ViewAction::None),
      KeyResult::Event(SearchEvent::Changed(query)) => {
        self.filter.search = query;
        self.list_state.select(Some(0));
        Some(ViewAction::None)
      }
      KeyResult::Event(SearchEvent::Submitted) => Some(ViewAction::None),
      KeyResult::Event(SearchEvent::Cancelled) => {
        self.filter.search.clear();
        Some(ViewAction::None)
      }
      KeyResult::NotHandled => None,
    }
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
        Some(ViewAction::None)
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
        Some(ViewAction::None)
      }
      KeyCode::Tab | KeyCode::Char('l') | KeyCode::Right => {
        self.select_tab(self.tab + 1);
        Some(ViewAction::None)
      }
      KeyCode::BackTab | KeyCode::Char('h') | KeyCode::Left => {
        self.select_tab(self.tab + TABS.len() - 1);
        Some(ViewAction::None)
      }
      KeyCode::Char(c @ '0'..='4') => {
        self.select_tab(c as usize - '0' as usize);
        Some(ViewAction::None)
      }
      _ => None,
    }
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('r') => {
        self.refresh();
        Some(ViewAction::None)
      }
      KeyCode::Char('s') => {
        self.filter.sort = self.filter.sort.next();
        Some(ViewAction::None)
      }
      KeyCode::Enter => {
        let idx = self.list_state.selected()?;
        let item = self.visible().get(idx)?.clone();
        Some(ViewAction::Push(Box::new(ItemDetailView::new(item))))
      }
      KeyCode::Char('q') | KeyCode::Esc => {
        if self.filter.is_active() {
          self.filter.search.clear();
          return Some(ViewAction::None);
        }
        Some(ViewAction::Pop)
      }
      _ => None,
    }
  }
}

impl View for DataListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_overlays(key)
      .or_else(|| self.handle_navigation(key))
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(1)])
      .split(area);

    self.render_tabs(frame, chunks[0]);
    self.render_list(frame, chunks[1]);
    self.search.render_overlay(frame, chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    self.label.clone()
  }

  fn tick(&mut self) {
    self.frame = self.frame.wrapping_add(1);

    if let Some(query) = &mut self.project {
      query.poll();
    }
    self.resolve_project();

    if let Some(items) = &mut self.items {
      if items.poll() {
        if let Some(e) = items.error() {
          self.notice = Some(Notice::error(format!("Failed to load data: {}", e)));
        }
      }
    }
  }

  fn refresh(&mut self) {
    if let Some(project) = &mut self.project {
      if project.error().is_some() {
        project.refetch();
        return;
      }
    }
    if let Some(items) = &mut self.items {
      items.refetch();
    }
  }

  fn captures_input(&self) -> bool {
    self.search.is_active()
  }

  fn take_notice(&mut self) -> Option<Notice> {
    self.notice.take()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("tab", "type").with_priority(30),
      ShortcutInfo::new("s", "sort").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(60),
    ]
  }
}
