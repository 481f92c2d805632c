//! Stale-while-revalidate synchronization of the project list.
//!
//! A [`ProjectSync`] is one consumer of the shared [`ProjectCache`]. Reads are
//! answered from the cache when possible; otherwise a fetch is spawned and its
//! result is delivered through a channel, applied on [`ProjectSync::poll`]
//! (UI tick) or [`ProjectSync::settle`] (CLI, tests).
//!
//! Every blocking fetch and every mutation bumps the consumer's generation.
//! Completions tagged with an older generation are dropped without touching
//! state or cache. Cache writes only happen while applying a completion, so a
//! dropped consumer never writes.

use chrono::Utc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::api::ProjectsApi;
use crate::auth::User;
use crate::cache::ProjectCache;
use crate::error::AppError;
use crate::model::project::sort_newest_first;
use crate::model::{NewProject, Project, ProjectUpdate};

/// Default lifetime of a cache entry.
pub const CACHE_DURATION: Duration = Duration::from_secs(10 * 60);

/// Minimum time a blocking load stays visible on a first or forced fetch.
pub const MIN_LOADING_TIME: Duration = Duration::from_millis(600);

/// What `get_projects` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
  /// No user; the list was cleared
  Empty,
  /// Served from the cache, optionally with a background refresh
  Cached { revalidating: bool },
  /// A blocking fetch was started
  Loading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchKind {
  Blocking,
  Background,
}

struct Outcome {
  generation: u64,
  kind: FetchKind,
  user_id: String,
  result: Result<Vec<Project>, AppError>,
}

pub struct ProjectSync {
  user: Option<User>,
  api: ProjectsApi,
  cache: ProjectCache,
  min_loading: Duration,

  projects: Vec<Project>,
  loading: bool,
  error: Option<String>,
  fetched_once: bool,
  /// The visible list came from a completed load, not just local splices
  loaded: bool,

  generation: u64,
  in_flight: usize,
  tx: mpsc::UnboundedSender<Outcome>,
  rx: mpsc::UnboundedReceiver<Outcome>,
}

impl ProjectSync {
  pub fn new(user: Option<User>, api: ProjectsApi, cache: ProjectCache) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      user,
      api,
      cache,
      min_loading: MIN_LOADING_TIME,
      projects: Vec::new(),
      loading: false,
      error: None,
      fetched_once: false,
      loaded: false,
      generation: 0,
      in_flight: 0,
      tx,
      rx,
    }
  }

  pub fn with_min_loading(mut self, min_loading: Duration) -> Self {
    self.min_loading = min_loading;
    self
  }

  pub fn user(&self) -> Option<&User> {
    self.user.as_ref()
  }

  /// Visible list, newest first.
  pub fn projects(&self) -> &[Project] {
    &self.projects
  }

  pub fn is_loading(&self) -> bool {
    self.loading
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  /// Re-evaluate the cache and fetch when needed.
  pub fn get_projects(&mut self) -> LoadStatus {
    let Some(user_id) = self.user.as_ref().map(|u| u.id.clone()) else {
      self.projects.clear();
      self.loading = false;
      return LoadStatus::Empty;
    };

    if let Some(entry) = self.cache.get(&user_id) {
      let revalidating = entry.age(Utc::now()) > self.cache.duration() / 2;
      self.projects = entry.projects;
      self.loading = false;
      self.fetched_once = true;
      self.loaded = true;

      if revalidating {
        debug!(user = %user_id, "project cache is stale, revalidating");
        self.spawn_fetch(user_id, FetchKind::Background, None);
      }
      return LoadStatus::Cached { revalidating };
    }

    self.start_blocking(user_id);
    LoadStatus::Loading
  }

  /// Drop the cached list and fetch again with a visible load.
  pub fn force_refresh(&mut self) -> LoadStatus {
    let Some(user_id) = self.user.as_ref().map(|u| u.id.clone()) else {
      return self.get_projects();
    };

    info!(user = %user_id, "refreshing projects");
    self.cache.invalidate(&user_id);
    self.fetched_once = false;
    self.start_blocking(user_id);
    LoadStatus::Loading
  }

  fn start_blocking(&mut self, user_id: String) {
    self.generation += 1;
    let start = Instant::now();
    self.loading = true;
    self.error = None;

    let deadline = (!self.fetched_once).then(|| start + self.min_loading);
    self.spawn_fetch(user_id, FetchKind::Blocking, deadline);
  }

  fn spawn_fetch(&mut self, user_id: String, kind: FetchKind, deadline: Option<Instant>) {
    self.in_flight += 1;
    let generation = self.generation;
    let api = self.api.clone();
    let tx = self.tx.clone();

    tokio::spawn(async move {
      let result = api.list_for_user(&user_id).await;
      if let Some(deadline) = deadline {
        tokio::time::sleep_until(deadline).await;
      }
      // The consumer may be gone
      let _ = tx.send(Outcome {
        generation,
        kind,
        user_id,
        result,
      });
    });
  }

  /// Apply completed fetches without waiting. Returns true if state changed.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    while let Ok(outcome) = self.rx.try_recv() {
      changed |= self.apply(outcome);
    }
    changed
  }

  /// Wait for every fetch this consumer has in flight and apply them.
  pub async fn settle(&mut self) {
    while self.in_flight > 0 {
      match self.rx.recv().await {
        Some(outcome) => {
          self.apply(outcome);
        }
        None => break,
      }
    }
  }

  fn apply(&mut self, outcome: Outcome) -> bool {
    self.in_flight = self.in_flight.saturating_sub(1);

    if outcome.generation != self.generation {
      debug!(
        generation = outcome.generation,
        current = self.generation,
        "dropping superseded project fetch"
      );
      return false;
    }

    match (outcome.kind, outcome.result) {
      (kind, Ok(mut projects)) => {
        sort_newest_first(&mut projects);
        self.cache.set(&outcome.user_id, projects.clone());
        self.projects = projects;
        self.loaded = true;
        if kind == FetchKind::Blocking {
          self.loading = false;
          self.error = None;
          self.fetched_once = true;
        }
        true
      }
      (FetchKind::Blocking, Err(e)) => {
        warn!("failed to fetch projects: {}", e);
        self.loading = false;
        self.error = Some(e.to_string());
        true
      }
      (FetchKind::Background, Err(e)) => {
        debug!("background project refresh failed: {}", e);
        false
      }
    }
  }

  /// Invalidate whatever is in flight; local mutations take precedence.
  fn supersede(&mut self) {
    self.generation += 1;
    self.loading = false;
  }

  fn require_user(&self) -> Result<String, AppError> {
    self
      .user
      .as_ref()
      .map(|u| u.id.clone())
      .ok_or(AppError::NotAuthenticated)
  }

  /// True when the visible list mirrors the remote one.
  fn is_settled(&self) -> bool {
    self.loaded && !self.loading
  }

  /// Rewrite the cache from the spliced list, or drop it when the list is
  /// only a partial view of the remote rows.
  fn store_local(&mut self, user_id: &str, settled: bool) {
    sort_newest_first(&mut self.projects);
    if settled {
      self.cache.set(user_id, self.projects.clone());
    } else {
      debug!(user = %user_id, "project list not loaded, invalidating cache");
      self.cache.invalidate(user_id);
    }
  }

  pub async fn create(&mut self, project: NewProject) -> Result<Project, AppError> {
    let user_id = self.require_user()?;
    let created = self.api.create(&user_id, project).await?;
    info!(id = %created.id, slug = %created.slug, "created project");

    let settled = self.is_settled();
    self.supersede();
    self.projects.insert(0, created.clone());
    self.store_local(&user_id, settled);
    Ok(created)
  }

  pub async fn update(&mut self, id: &str, changes: ProjectUpdate) -> Result<Project, AppError> {
    let user_id = self.require_user()?;
    let updated = self.api.update(id, changes).await?;

    let settled = self.is_settled();
    self.supersede();
    for project in self.projects.iter_mut().filter(|p| p.id == id) {
      *project = updated.clone();
    }
    self.store_local(&user_id, settled);
    Ok(updated)
  }

  pub async fn delete(&mut self, id: &str) -> Result<(), AppError> {
    let user_id = self.require_user()?;
    self.api.delete(id).await?;
    info!(id, "deleted project");

    let settled = self.is_settled();
    self.supersede();
    self.projects.retain(|p| p.id != id);
    self.store_local(&user_id, settled);
    Ok(())
  }

  /// The signed-in user's project with the given slug.
  pub async fn project_by_slug(&self, slug: &str) -> Result<Project, AppError> {
    let user_id = self.require_user()?;
    self.api.by_slug(&user_id, slug).await
  }
}
