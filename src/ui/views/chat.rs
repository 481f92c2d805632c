use crate::context::Context;
use crate::error::AppError;
use crate::model::Project;
use crate::query::{Query, QueryState};
use crate::ui::renderfns::format_date;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Chatbot page for a slug: the public page, or the owner's admin preview
pub struct ChatView {
  slug: String,
  admin: bool,
  query: Query<Project>,
}

impl ChatView {
  /// Anyone may open a public chatbot, matched by custom slug first.
  pub fn public(ctx: &Context, slug: &str) -> Self {
    let api = ctx.projects.clone();
    let owned = slug.to_string();
    let mut query = Query::new(move || {
      let api = api.clone();
      let slug = owned.clone();
      async move { api.public_by_slug(&slug).await }
    });
    query.fetch();

    Self {
      slug: slug.to_string(),
      admin: false,
      query,
    }
  }

  /// The owner's own project, public or not.
  pub fn admin(ctx: &Context, slug: &str) -> Self {
    let api = ctx.projects.clone();
    let user_id = ctx.user.as_ref().map(|u| u.id.clone());
    let owned = slug.to_string();
    let mut query = Query::new(move || {
      let api = api.clone();
      let user_id = user_id.clone();
      let slug = owned.clone();
      async move {
        let user_id = user_id.ok_or(AppError::NotAuthenticated)?;
        api.by_slug(&user_id, &slug).await
      }
    });
    query.fetch();

    Self {
      slug: slug.to_string(),
      admin: true,
      query,
    }
  }

  fn project_lines(project: &Project) -> Vec<Line<'_>> {
    let mut lines = vec![
      Line::from(Span::styled(
        project.name.as_str(),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
      )),
      Line::from(""),
    ];

    if !project.description.is_empty() {
      lines.push(Line::from(project.description.as_str()));
      lines.push(Line::from(""));
    }

    lines.push(Line::from(vec![
      Span::styled("Plan: ", Style::default().fg(Color::DarkGray)),
      Span::styled(project.plan.as_str(), Style::default().fg(Color::Yellow)),
      Span::raw("  "),
      Span::styled("Since: ", Style::default().fg(Color::DarkGray)),
      Span::raw(format_date(&project.created_at)),
    ]));

    if let Some(links) = &project.social_links {
      for (name, url) in links {
        if let Some(url) = url.as_str().filter(|u| !u.is_empty()) {
          lines.push(Line::from(vec![
            Span::styled(format!("{}: ", name), Style::default().fg(Color::DarkGray)),
            Span::raw(url.to_string()),
          ]));
        }
      }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
      "Conversations are not available in the terminal.",
      Style::default().fg(Color::DarkGray),
    )));
    lines
  }

  fn render_page(&self, frame: &mut Frame, area: Rect) {
    let title = match self.query.state() {
      QueryState::Loading => format!(" /{} (loading...) ", self.slug),
      _ if self.admin => format!(" /admin/chat/{} ", self.slug),
      _ => format!(" /chat/{} ", self.slug),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let paragraph = match self.query.state() {
      QueryState::Idle | QueryState::Loading => {
        Paragraph::new("Loading chatbot...").style(Style::default().fg(Color::DarkGray))
      }
      QueryState::Error(e) => Paragraph::new(format!("{}\n\nPress 'r' to retry.", e))
        .style(Style::default().fg(Color::Red)),
      QueryState::Success(project) => Paragraph::new(Self::project_lines(project)),
    };
    frame.render_widget(paragraph.wrap(Wrap { trim: true }), inner);
  }
}

impl View for ChatView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.refresh();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_page(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    match self.query.data() {
      Some(project) => project.name.clone(),
      None => self.slug.clone(),
    }
  }

  fn tick(&mut self) {
    self.query.poll();
  }

  fn refresh(&mut self) {
    self.query.refetch();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::Table;
  use crate::context::fixtures::context;
  use crate::testutil::{backends, seed_project, user};
  use serde_json::json;

  #[tokio::test]
  async fn test_public_page_by_custom_slug() {
    let (memory, backend) = backends();
    memory.seed(
      Table::Projects,
      json!({"name": "Support Bot", "description": "", "plan": "personal", "user_id": "u1",
             "slug": "support-bot", "custom_slug": "help", "is_public": true}),
    );
    let ctx = context(backend, None);

    let mut view = ChatView::public(&ctx, "help");
    view.query.wait().await;
    assert_eq!(view.breadcrumb_label(), "Support Bot");
  }

  #[tokio::test]
  async fn test_private_project_is_not_public() {
    let (memory, backend) = backends();
    seed_project(&memory, "u1", "Support Bot");
    let ctx = context(backend, Some(user("u1")));

    let mut public = ChatView::public(&ctx, "support-bot");
    public.query.wait().await;
    assert_eq!(
      public.query.error(),
      Some("Chatbot not found or not publicly available")
    );

    let mut admin = ChatView::admin(&ctx, "support-bot");
    admin.query.wait().await;
    assert_eq!(admin.breadcrumb_label(), "Support Bot");
  }

  #[tokio::test]
  async fn test_admin_page_requires_user() {
    let (_memory, backend) = backends();
    let ctx = context(backend, None);

    let mut view = ChatView::admin(&ctx, "support-bot");
    view.query.wait().await;
    assert_eq!(view.query.error(), Some("User not authenticated"));
  }
}
