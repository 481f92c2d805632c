//! Fixtures shared by unit tests.

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::User;
use crate::backend::memory::MemoryBackend;
use crate::backend::{Table, TableBackend};
use crate::cache::{ProjectCache, SqliteStore};
use crate::model::{Plan, Project};

pub fn user(id: &str) -> User {
  User {
    id: id.to_string(),
    email: format!("{}@example.com", id),
    display_name: None,
  }
}

/// Project owned by `u1`, created at 09:`minute` on 2024-01-01.
pub fn project(id: &str, minute: u32) -> Project {
  let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, minute, 0).unwrap();
  Project {
    id: id.to_string(),
    name: format!("Bot {}", id),
    description: String::new(),
    plan: Plan::Personal,
    social_links: None,
    user_id: "u1".to_string(),
    slug: format!("bot-{}", id),
    is_public: false,
    custom_slug: None,
    created_at: at,
    updated_at: at,
  }
}

/// Seed a project row for `user_id`; the backend assigns id and timestamps.
pub fn seed_project(backend: &MemoryBackend, user_id: &str, name: &str) -> Value {
  backend.seed(
    Table::Projects,
    json!({
      "name": name,
      "description": "",
      "plan": "personal",
      "user_id": user_id,
      "slug": crate::model::slugify(name),
      "is_public": false
    }),
  )
}

pub fn memory_cache() -> ProjectCache {
  ProjectCache::init(
    Arc::new(SqliteStore::in_memory().unwrap()),
    chrono::Duration::minutes(10),
  )
}

pub fn backends() -> (Arc<MemoryBackend>, Arc<dyn TableBackend>) {
  let memory = Arc::new(MemoryBackend::new());
  let shared: Arc<dyn TableBackend> = memory.clone();
  (memory, shared)
}
