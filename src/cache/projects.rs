//! Two-layer cache for a user's project list.
//!
//! The in-memory registry answers first; the persisted store holds the last
//! known list under one fixed key so a restart can still serve it. Store
//! failures are logged and treated as a miss, never surfaced.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::registry::{CachedProjects, MemoryRegistry};
use super::store::PersistedStore;
use crate::model::Project;

/// Fixed key of the persisted record
const CACHE_KEY: &str = "projects_cache";

/// Persisted shape: `{projects, timestamp, userId}` with epoch millis.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedRecord {
  projects: Vec<Project>,
  timestamp: i64,
  user_id: String,
}

impl PersistedRecord {
  fn cached_at(&self) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(self.timestamp)
  }
}

/// Project cache service. Clones share both layers.
#[derive(Clone)]
pub struct ProjectCache {
  registry: MemoryRegistry,
  store: Arc<dyn PersistedStore>,
  duration: Duration,
}

impl ProjectCache {
  /// Build the service and warm the registry from a still-valid persisted record.
  pub fn init(store: Arc<dyn PersistedStore>, duration: Duration) -> Self {
    let cache = Self {
      registry: MemoryRegistry::new(),
      store,
      duration,
    };

    if let Some(record) = cache.read_persisted() {
      match record.cached_at() {
        Some(cached_at) if cache.is_fresh(cached_at, Utc::now()) => {
          debug!(user = %record.user_id, count = record.projects.len(), "warmed project cache");
          cache.registry.insert(
            &record.user_id,
            CachedProjects::new(record.projects, cached_at),
          );
        }
        _ => cache.remove_persisted(),
      }
    }

    cache
  }

  /// How long an entry stays valid.
  pub fn duration(&self) -> Duration {
    self.duration
  }

  fn is_fresh(&self, cached_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - cached_at < self.duration
  }

  /// Valid entry for `user_id`, checking memory first and then the store.
  ///
  /// Expired, foreign or corrupt persisted records are deleted.
  pub fn get(&self, user_id: &str) -> Option<CachedProjects> {
    let now = Utc::now();

    if let Some(entry) = self.registry.get(user_id) {
      if self.is_fresh(entry.cached_at, now) {
        return Some(entry);
      }
    }

    if let Some(record) = self.read_persisted() {
      if let Some(cached_at) = record.cached_at() {
        if record.user_id == user_id && self.is_fresh(cached_at, now) {
          let entry = CachedProjects::new(record.projects, cached_at);
          self.registry.insert(user_id, entry.clone());
          return Some(entry);
        }
      }
    }

    self.remove_persisted();
    self.registry.remove(user_id);
    None
  }

  /// Cache `projects` for `user_id` as fetched now.
  pub fn set(&self, user_id: &str, projects: Vec<Project>) -> CachedProjects {
    let entry = CachedProjects::new(projects, Utc::now());
    self.put(user_id, entry.clone());
    entry
  }

  /// Write an entry with its own timestamp to both layers.
  pub fn put(&self, user_id: &str, entry: CachedProjects) {
    let record = PersistedRecord {
      projects: entry.projects.clone(),
      timestamp: entry.cached_at.timestamp_millis(),
      user_id: user_id.to_string(),
    };
    self.registry.insert(user_id, entry);

    match serde_json::to_string(&record) {
      Ok(json) => {
        if let Err(e) = self.store.set(CACHE_KEY, &json) {
          warn!("failed to persist project cache: {}", e);
        }
      }
      Err(e) => warn!("failed to serialize project cache: {}", e),
    }
  }

  /// Drop the entry for `user_id` from both layers.
  pub fn invalidate(&self, user_id: &str) {
    self.registry.remove(user_id);
    self.remove_persisted();
  }

  /// Drop everything, e.g. on logout.
  pub fn clear(&self) {
    self.registry.clear();
    self.remove_persisted();
  }

  fn read_persisted(&self) -> Option<PersistedRecord> {
    let raw = match self.store.get(CACHE_KEY) {
      Ok(raw) => raw?,
      Err(e) => {
        warn!("failed to read project cache: {}", e);
        return None;
      }
    };

    match serde_json::from_str(&raw) {
      Ok(record) => Some(record),
      Err(e) => {
        debug!("discarding corrupt project cache: {}", e);
        self.remove_persisted();
        None
      }
    }
  }

  fn remove_persisted(&self) {
    if let Err(e) = self.store.remove(CACHE_KEY) {
      warn!("failed to clear project cache: {}", e);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::store::SqliteStore;
  use crate::testutil::project;

  fn cache_with(store: Arc<dyn PersistedStore>) -> ProjectCache {
    ProjectCache::init(store, Duration::minutes(10))
  }

  #[test]
  fn test_set_then_get_same_user() {
    let cache = cache_with(Arc::new(SqliteStore::in_memory().unwrap()));
    cache.set("u1", vec![project("2", 2), project("1", 1)]);

    let entry = cache.get("u1").unwrap();
    let ids: Vec<&str> = entry.projects.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "1"]);
    assert!(cache.get("u2").is_none());
  }

  #[test]
  fn test_expired_entry_is_removed_from_both_layers() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let cache = cache_with(store.clone());
    cache.put(
      "u1",
      CachedProjects::new(vec![project("1", 1)], Utc::now() - Duration::minutes(11)),
    );

    assert!(cache.get("u1").is_none());
    assert_eq!(store.get(CACHE_KEY).unwrap(), None);
  }

  #[test]
  fn test_persisted_record_survives_new_instance() {
    let store: Arc<dyn PersistedStore> = Arc::new(SqliteStore::in_memory().unwrap());
    cache_with(store.clone()).set("u1", vec![project("1", 1)]);

    let restarted = cache_with(store);
    let entry = restarted.get("u1").unwrap();
    assert_eq!(entry.projects[0].id, "1");
  }

  #[test]
  fn test_persisted_shape() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    cache_with(store.clone()).set("u1", vec![project("1", 1)]);

    let raw = store.get(CACHE_KEY).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["userId"], "u1");
    assert!(value["timestamp"].is_i64());
    assert_eq!(value["projects"][0]["id"], "1");
  }

  #[test]
  fn test_corrupt_record_is_a_miss_and_deleted() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    store.set(CACHE_KEY, "{not json").unwrap();

    let cache = cache_with(store.clone());
    assert!(cache.get("u1").is_none());
    assert_eq!(store.get(CACHE_KEY).unwrap(), None);
  }

  #[test]
  fn test_invalidate_and_clear() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let cache = cache_with(store.clone());

    cache.set("u1", vec![project("1", 1)]);
    cache.invalidate("u1");
    assert!(cache.get("u1").is_none());

    cache.set("u1", vec![project("1", 1)]);
    cache.clear();
    assert!(cache.get("u1").is_none());
    assert_eq!(store.get(CACHE_KEY).unwrap(), None);
  }
}
