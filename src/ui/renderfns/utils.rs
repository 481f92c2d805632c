use chrono::{DateTime, Utc};
use ratatui::prelude::Color;

use crate::model::{IssueStatus, Severity};

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Human readable size, 1024 based
pub fn format_file_size(bytes: u64) -> String {
  const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

  if bytes == 0 {
    return "0 Bytes".to_string();
  }

  let mut value = bytes as f64;
  let mut unit = 0;
  while value >= 1024.0 && unit < UNITS.len() - 1 {
    value /= 1024.0;
    unit += 1;
  }

  let rounded = format!("{:.2}", value);
  let rounded = rounded.trim_end_matches('0').trim_end_matches('.');
  format!("{} {}", rounded, UNITS[unit])
}

pub fn format_date(at: &DateTime<Utc>) -> String {
  at.format("%b %-d, %Y").to_string()
}

pub fn severity_color(severity: Severity) -> Color {
  match severity {
    Severity::Low => Color::Green,
    Severity::Medium => Color::Yellow,
    Severity::High => Color::LightRed,
    Severity::Critical => Color::Red,
  }
}

pub fn status_color(status: IssueStatus) -> Color {
  match status {
    IssueStatus::Open => Color::White,
    IssueStatus::InProgress => Color::Yellow,
    IssueStatus::Resolved | IssueStatus::Closed => Color::Green,
  }
}

/// Spinner frame for a loading indicator, advanced once per tick
pub fn spinner(frame: usize) -> char {
  const FRAMES: [char; 4] = ['|', '/', '-', '\\'];
  FRAMES[frame % FRAMES.len()]
}
