use crate::context::Context;
use crate::model::Project;
use crate::projects::ProjectSync;
use crate::routes::Route;
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_date, spinner, truncate};
use crate::ui::view::{Notice, ShortcutInfo, View, ViewAction};
use crate::ui::views::DataListView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// The signed-in user's chatbot projects
pub struct ProjectListView {
  ctx: Context,
  sync: ProjectSync,
  list_state: ListState,
  search: SearchInput,
  filter: String,
  notice: Option<Notice>,
  refreshing: bool,
  frame: usize,
}

impl ProjectListView {
  pub fn new(ctx: Context) -> Self {
    let mut sync = ctx.project_sync();
    sync.get_projects();

    Self {
      ctx,
      sync,
      list_state: ListState::default(),
      search: SearchInput::new(),
      filter: String::new(),
      notice: None,
      refreshing: false,
      frame: 0,
    }
  }

  fn visible(&self) -> Vec<&Project> {
    let needle = self.filter.to_lowercase();
    self
      .sync
      .projects()
      .iter()
      .filter(|p| {
        needle.is_empty()
          || p.name.to_lowercase().contains(&needle)
          || p.description.to_lowercase().contains(&needle)
          || p.slug.contains(&needle)
      })
      .collect()
  }

  fn selected(&self) -> Option<Project> {
    let idx = self.list_state.selected()?;
    self.visible().get(idx).map(|p| (*p).clone())
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.visible().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = if self.sync.is_loading() {
      format!(" Projects (loading {}) ", spinner(self.frame))
    } else if let Some(e) = self.sync.error() {
      format!(" Projects (error: {}) ", e)
    } else if !self.filter.is_empty() {
      format!(" Projects ({}/{}) [/{}] ", len, self.sync.projects().len(), self.filter)
    } else {
      format!(" Projects ({}) ", len)
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 {
      let content = if self.sync.user().is_none() {
        "Not signed in. Run `chatdeck login` first."
      } else if self.sync.is_loading() {
        "Loading projects..."
      } else if self.sync.error().is_some() {
        "Failed to load projects. Press 'r' to retry."
      } else if !self.filter.is_empty() {
        "No projects match the search."
      } else {
        "No projects yet. Create one with `chatdeck project create`."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let name_width = (area.width as usize / 3).max(12);
    let items: Vec<ListItem> = self
      .visible()
      .iter()
      .map(|project| {
        let visibility = if project.is_public {
          Span::styled("public ", Style::default().fg(Color::Green))
        } else {
          Span::styled("private", Style::default().fg(Color::DarkGray))
        };
        let line = Line::from(vec![
          Span::styled(
            format!("{:<width$}", truncate(&project.name, name_width), width = name_width),
            Style::default().fg(Color::White),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:<10}", project.plan.as_str()),
            Style::default().fg(Color::Yellow),
          ),
          visibility,
          Span::raw(" "),
          Span::styled(
            format!("{:<13}", format_date(&project.created_at)),
            Style::default().fg(Color::DarkGray),
          ),
          Span::styled(
            format!("/{}", project.public_slug()),
            Style::default().fg(Color::Cyan),
          ),
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

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  // Key handling helpers for or_else chain pattern
  fn handle_overlays(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.search.handle_key(key) {
      KeyResult::Handled => Some(ViewAction::None),
      KeyResult::Event(SearchEvent::Changed(query)) => {
        self.filter = query;
        self.list_state.select(Some(0));
        Some(ViewAction::None)
      }
      KeyResult::Event(SearchEvent::Submitted) => Some(ViewAction::None),
      KeyResult::Event(SearchEvent::Cancelled) => {
        self.filter.clear();
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
      KeyCode::Char('g') | KeyCode::Home => {
        self.list_state.select_first();
        Some(ViewAction::None)
      }
      KeyCode::Char('G') | KeyCode::End => {
        self.list_state.select_last();
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
      KeyCode::Enter => {
        let project = self.selected()?;
        Some(ViewAction::Push(Box::new(DataListView::for_project(
          self.ctx.clone(),
          &project,
        ))))
      }
      KeyCode::Char('o') => {
        let project = self.selected()?;
        if !project.is_public {
          return Some(ViewAction::Notify(Notice::error(format!(
            "{} is not public",
            project.name
          ))));
        }
        Some(ViewAction::Navigate(Route::PublicChat {
          slug: project.public_slug().to_string(),
        }))
      }
      KeyCode::Char('a') => {
        let project = self.selected()?;
        Some(ViewAction::Navigate(Route::AdminChat {
          slug: project.slug,
        }))
      }
      KeyCode::Char('q') | KeyCode::Esc => {
        if !self.filter.is_empty() {
          self.filter.clear();
          return Some(ViewAction::None);
        }
        Some(ViewAction::Pop)
      }
      _ => None,
    }
  }
}

impl View for ProjectListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_overlays(key)
      .or_else(|| self.handle_navigation(key))
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Projects".to_string()
  }

  fn tick(&mut self) {
    self.frame = self.frame.wrapping_add(1);
    self.sync.poll();
    if !self.refreshing || self.sync.is_loading() {
      return;
    }

    self.refreshing = false;
    self.notice = Some(match self.sync.error() {
      Some(e) => Notice::error(format!("Failed to refresh projects: {}", e)),
      None => Notice::success("Projects refreshed"),
    });
  }

  fn refresh(&mut self) {
    if self.sync.user().is_none() {
      self.notice = Some(Notice::error("Not signed in"));
      return;
    }
    self.sync.force_refresh();
    self.refreshing = true;
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
      ShortcutInfo::new("enter", "data").with_priority(30),
      ShortcutInfo::new("o", "public chat").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(60),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::context::fixtures::context;
  use crate::testutil::{backends, seed_project, user};
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  async fn settle(view: &mut ProjectListView) {
    view.sync.settle().await;
    view.tick();
  }

  #[tokio::test(start_paused = true)]
  async fn test_loads_and_filters() {
    let (memory, backend) = backends();
    seed_project(&memory, "u1", "Support Bot");
    seed_project(&memory, "u1", "Sales Helper");
    let mut view = ProjectListView::new(context(backend, Some(user("u1"))));
    assert!(view.sync.is_loading());

    settle(&mut view).await;
    assert_eq!(view.visible().len(), 2);

    view.handle_key(key(KeyCode::Char('/')));
    for c in "sales".chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
    let names: Vec<&str> = view.visible().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Sales Helper"]);
  }

  #[tokio::test(start_paused = true)]
  async fn test_refresh_reports_notice() {
    let (memory, backend) = backends();
    seed_project(&memory, "u1", "Support Bot");
    let mut view = ProjectListView::new(context(backend, Some(user("u1"))));
    settle(&mut view).await;
    assert!(view.take_notice().is_none());

    view.handle_key(key(KeyCode::Char('r')));
    assert!(view.sync.is_loading());
    settle(&mut view).await;
    assert_eq!(view.take_notice(), Some(Notice::success("Projects refreshed")));
  }

  #[tokio::test(start_paused = true)]
  async fn test_private_project_cannot_open_public_chat() {
    let (memory, backend) = backends();
    seed_project(&memory, "u1", "Support Bot");
    let mut view = ProjectListView::new(context(backend, Some(user("u1"))));
    settle(&mut view).await;
    view.list_state.select(Some(0));

    match view.handle_key(key(KeyCode::Char('o'))) {
      ViewAction::Notify(notice) => assert_eq!(notice, Notice::error("Support Bot is not public")),
      _ => panic!("expected a notice"),
    }
  }
}
