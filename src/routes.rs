//! Route table shared by the TUI and the `route` subcommand.
//!
//! Paths are matched segment by segment against [`Route::pattern`]; a
//! `:slug` segment captures one path segment. Anything unmatched is the
//! admin dashboard.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
  Landing,
  GetStarted,
  Discover,
  PublicChat { slug: String },
  AdminChat { slug: String },
  Settings,
  HelpSupport,
  AdminDiscover,
  Projects,
  ProjectDetail { slug: String },
  Playground,
  DataLibrary,
  QuickCreate,
  Dashboard,
}

/// Every matchable route, in match order
const TABLE: [Route; 13] = [
  Route::Landing,
  Route::GetStarted,
  Route::Discover,
  Route::PublicChat {
    slug: String::new(),
  },
  Route::AdminChat {
    slug: String::new(),
  },
  Route::Settings,
  Route::HelpSupport,
  Route::AdminDiscover,
  Route::Projects,
  Route::ProjectDetail {
    slug: String::new(),
  },
  Route::Playground,
  Route::DataLibrary,
  Route::QuickCreate,
];

impl Route {
  pub fn pattern(&self) -> &'static str {
    match self {
      Route::Landing => "/",
      Route::GetStarted => "/get-started",
      Route::Discover => "/chat",
      Route::PublicChat { .. } => "/chat/:slug",
      Route::AdminChat { .. } => "/admin/chat/:slug",
      Route::Settings => "/admin/settings",
      Route::HelpSupport => "/admin/help-support",
      Route::AdminDiscover => "/admin/discover",
      Route::Projects => "/admin/projects",
      Route::ProjectDetail { .. } => "/admin/projects/:slug",
      Route::Playground => "/admin/playground",
      Route::DataLibrary => "/admin/data-library",
      Route::QuickCreate => "/admin/quick-create",
      Route::Dashboard => "/admin",
    }
  }

  /// Resolve a path. Trailing slashes are ignored.
  pub fn parse(path: &str) -> Route {
    let segments = split(path);

    for template in TABLE.iter() {
      let pattern = split(template.pattern());
      if pattern.len() != segments.len() {
        continue;
      }

      let mut slug = None;
      let matched = pattern.iter().zip(&segments).all(|(p, s)| {
        if *p == ":slug" {
          slug = Some(s.to_string());
          true
        } else {
          p == s
        }
      });

      if matched {
        return template.clone().with_slug(slug.unwrap_or_default());
      }
    }

    Route::Dashboard
  }

  fn with_slug(self, value: String) -> Route {
    match self {
      Route::PublicChat { .. } => Route::PublicChat { slug: value },
      Route::AdminChat { .. } => Route::AdminChat { slug: value },
      Route::ProjectDetail { .. } => Route::ProjectDetail { slug: value },
      other => other,
    }
  }

  pub fn slug(&self) -> Option<&str> {
    match self {
      Route::PublicChat { slug } | Route::AdminChat { slug } | Route::ProjectDetail { slug } => {
        Some(slug)
      }
      _ => None,
    }
  }

  /// Public pages are reachable signed out; everything under `/admin` is not.
  pub fn requires_auth(&self) -> bool {
    !matches!(
      self,
      Route::Landing | Route::GetStarted | Route::Discover | Route::PublicChat { .. }
    )
  }

  /// Render back to a path.
  pub fn path(&self) -> String {
    match self.slug() {
      Some(slug) => self.pattern().replace(":slug", slug),
      None => self.pattern().to_string(),
    }
  }

  pub fn title(&self) -> &'static str {
    match self {
      Route::Landing => "Home",
      Route::GetStarted => "Get Started",
      Route::Discover | Route::AdminDiscover => "Discover",
      Route::PublicChat { .. } | Route::AdminChat { .. } => "Chat",
      Route::Settings => "Settings",
      Route::HelpSupport => "Help & Support",
      Route::Projects => "Projects",
      Route::ProjectDetail { .. } => "Project",
      Route::Playground => "Playground",
      Route::DataLibrary => "Data Library",
      Route::QuickCreate => "Quick Create",
      Route::Dashboard => "Dashboard",
    }
  }
}

impl fmt::Display for Route {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.path())
  }
}

fn split(path: &str) -> Vec<&str> {
  path.split('/').filter(|s| !s.is_empty()).collect()
}
