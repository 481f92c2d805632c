use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::model::Project;

/// Projects cached for one user, with the time they were fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedProjects {
  pub projects: Vec<Project>,
  pub cached_at: DateTime<Utc>,
}

impl CachedProjects {
  pub fn new(projects: Vec<Project>, cached_at: DateTime<Utc>) -> Self {
    Self {
      projects,
      cached_at,
    }
  }

  pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
    now - self.cached_at
  }
}

/// In-memory map from user id to cached projects.
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
  entries: Arc<Mutex<HashMap<String, CachedProjects>>>,
}

impl MemoryRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, user_id: &str) -> Option<CachedProjects> {
    self
      .entries
      .lock()
      .ok()
      .and_then(|entries| entries.get(user_id).cloned())
  }

  pub fn insert(&self, user_id: &str, entry: CachedProjects) {
    if let Ok(mut entries) = self.entries.lock() {
      entries.insert(user_id.to_string(), entry);
    }
  }

  pub fn remove(&self, user_id: &str) {
    if let Ok(mut entries) = self.entries.lock() {
      entries.remove(user_id);
    }
  }

  pub fn clear(&self) {
    if let Ok(mut entries) = self.entries.lock() {
      entries.clear();
    }
  }
}
