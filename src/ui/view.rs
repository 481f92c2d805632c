use crossterm::event::KeyEvent;
use ratatui::prelude::*;

use crate::routes::Route;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
  Success,
  Error,
}

/// Transient message shown in the footer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub kind: NoticeKind,
  pub message: String,
}

impl Notice {
  pub fn success(message: impl Into<String>) -> Self {
    Self {
      kind: NoticeKind::Success,
      message: message.into(),
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      kind: NoticeKind::Error,
      message: message.into(),
    }
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
  /// Replace the stack with the view for a route
  Navigate(Route),
  Notify(Notice),
}

/// Trait for view behavior
///
/// Views handle their own input modes (search, tabs) and return actions
/// for the App to execute: App → View → Components.
///
/// Views that load data asynchronously poll in `tick()`.
pub trait View {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  fn render(&mut self, frame: &mut Frame, area: Rect);

  fn breadcrumb_label(&self) -> String;

  /// Called on each tick to poll pending fetches
  fn tick(&mut self) {}

  /// True while an overlay of the view (search) owns the keyboard
  fn captures_input(&self) -> bool {
    false
  }

  /// Reload from the backend (`:refresh`)
  fn refresh(&mut self) {}

  /// A message produced since the last call, for the footer
  fn take_notice(&mut self) -> Option<Notice> {
    None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}
