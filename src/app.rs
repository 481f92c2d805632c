use crate::commands::Invocation;
use crate::context::Context;
use crate::event::{Event, EventHandler};
use crate::routes::Route;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::renderfns::{draw_footer, draw_header};
use crate::ui::view::{Notice, View, ViewAction};
use crate::ui::views;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// How long a notice stays in the footer
const NOTICE_TTL: Duration = Duration::from_secs(4);

/// Main application state
pub struct App {
  ctx: Context,

  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// `:` palette
  command: CommandInput,

  notice: Option<(Notice, Instant)>,

  title: String,

  should_quit: bool,
}

impl App {
  pub fn new(ctx: Context, route: Route) -> Self {
    info!(route = %route, "starting tui");
    let root = views::open(&route, &ctx);
    let title = ctx.config.display_title();

    Self {
      ctx,
      view_stack: vec![root],
      command: CommandInput::new(),
      notice: None,
      title,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.main_loop(&mut terminal).await;

    // Cleanup terminal, even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn main_loop(
    &mut self,
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
  ) -> Result<()> {
    let mut events = EventHandler::new(Duration::from_millis(250));

    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.tick(),
        Some(Event::Resize) => {}
        None => break,
      }
    }

    Ok(())
  }

  fn current_view(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  fn notify(&mut self, notice: Notice) {
    debug!(message = %notice.message, "notice");
    self.notice = Some((notice, Instant::now()));
  }

  fn tick(&mut self) {
    let mut notices = Vec::new();
    for view in self.view_stack.iter_mut() {
      view.tick();
      if let Some(notice) = view.take_notice() {
        notices.push(notice);
      }
    }
    for notice in notices {
      self.notify(notice);
    }

    if let Some((_, shown_at)) = &self.notice {
      if shown_at.elapsed() >= NOTICE_TTL {
        self.notice = None;
      }
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      self.should_quit = true;
      return;
    }

    let view_owns_input = self
      .view_stack
      .last()
      .is_some_and(|view| view.captures_input());

    if !view_owns_input {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(invocation)) => {
          self.execute(invocation);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let action = match self.current_view() {
      Some(view) => view.handle_key(key),
      None => ViewAction::None,
    };
    self.apply(action);
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        // Root stays; leave with :quit or ctrl-c
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        }
      }
      ViewAction::Navigate(route) => self.navigate(route),
      ViewAction::Notify(notice) => self.notify(notice),
    }
  }

  fn navigate(&mut self, route: Route) {
    debug!(route = %route, "navigate");
    self.view_stack = vec![views::open(&route, &self.ctx)];
  }

  fn execute(&mut self, invocation: Invocation) {
    match invocation.name.as_str() {
      "" => {}
      "projects" => self.navigate(Route::Projects),
      "library" => self.navigate(Route::DataLibrary),
      "open" => match invocation.arg {
        Some(path) => self.navigate(Route::parse(&path)),
        None => self.notify(Notice::error("Usage: open <path>")),
      },
      "refresh" => {
        if let Some(view) = self.current_view() {
          view.refresh();
        }
      }
      "quit" => self.should_quit = true,
      other => self.notify(Notice::error(format!("Unknown command: {}", other))),
    }
  }

  fn breadcrumb(&self) -> Vec<String> {
    self.view_stack.iter().map(|v| v.breadcrumb_label()).collect()
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Main content
        Constraint::Length(1), // Footer
      ])
      .split(frame.area());

    let shortcuts = self
      .view_stack
      .last()
      .map(|v| v.shortcuts())
      .unwrap_or_default();
    let user = self.ctx.user.as_ref().map(|u| u.label().to_string());
    draw_header(frame, chunks[0], &self.title, user.as_deref(), &shortcuts);

    if let Some(view) = self.view_stack.last_mut() {
      view.render(frame, chunks[1]);
    }
    self.command.render_overlay(frame, chunks[1]);

    let breadcrumb = self.breadcrumb();
    draw_footer(
      frame,
      chunks[2],
      &breadcrumb,
      self.notice.as_ref().map(|(n, _)| n),
    );
  }
}
