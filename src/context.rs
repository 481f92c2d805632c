//! Wiring shared by the TUI and the CLI: config, signed-in user, accessors
//! bound to one backend, and the project cache.

use color_eyre::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::auth::{Auth, AuthClient, SessionStore, User};
use crate::backend::{RestBackend, TableBackend};
use crate::cache::{NoopStore, PersistedStore, ProjectCache, SqliteStore};
use crate::config::Config;
use crate::data::{DataApi, DataItems};
use crate::model::DataType;
use crate::projects::{ProjectSync, ProjectsApi};

#[derive(Clone)]
pub struct Context {
  pub config: Config,
  pub user: Option<User>,
  pub projects: ProjectsApi,
  pub data: DataApi,
  pub cache: ProjectCache,
  pub auth: Arc<Auth>,
}

impl Context {
  /// Open the cache, restore the session and bind the accessors to it.
  pub async fn connect(config: Config) -> Result<Self> {
    let api_key = Config::get_api_key()?;
    let cache = ProjectCache::init(open_store(&config), config.cache.duration());

    let client = AuthClient::new(&config.backend.url, &api_key)?;
    let auth = Auth::new(client, SessionStore::new(config.session_path()?), cache.clone());
    let session = auth.restore().await;

    let backend = RestBackend::new(
      &config.backend.url,
      &api_key,
      session.as_ref().map(|s| s.access_token.as_str()),
    )?;
    let user = session.map(|s| s.user);

    match &user {
      Some(u) => info!(user = %u.id, "session restored"),
      None => info!("no session, continuing signed out"),
    }

    Ok(Self::with_backend(config, user, Arc::new(backend), cache, auth))
  }

  pub fn with_backend(
    config: Config,
    user: Option<User>,
    backend: Arc<dyn TableBackend>,
    cache: ProjectCache,
    auth: Auth,
  ) -> Self {
    Self {
      config,
      user,
      projects: ProjectsApi::new(backend.clone()),
      data: DataApi::new(backend),
      cache,
      auth: Arc::new(auth),
    }
  }

  pub fn min_loading(&self) -> Duration {
    self.config.cache.min_loading()
  }

  /// A new consumer of the shared project cache for the current user.
  pub fn project_sync(&self) -> ProjectSync {
    ProjectSync::new(self.user.clone(), self.projects.clone(), self.cache.clone())
      .with_min_loading(self.min_loading())
  }

  pub fn data_items(&self, project_id: Option<String>, item_type: Option<DataType>) -> DataItems {
    DataItems::new(self.user.clone(), self.data.clone(), project_id, item_type)
  }
}

fn open_store(config: &Config) -> Arc<dyn PersistedStore> {
  if !config.cache.persist {
    return Arc::new(NoopStore);
  }

  let opened = config
    .cache_db_path()
    .and_then(|path| SqliteStore::open(&path));

  match opened {
    Ok(store) => Arc::new(store),
    Err(e) => {
      warn!("cache disabled: {}", e);
      Arc::new(NoopStore)
    }
  }
}

#[cfg(test)]
pub mod fixtures {
  use super::*;
  use crate::testutil::memory_cache;

  /// Context over an in-memory backend. Auth points at an unroutable address.
  pub fn context(backend: Arc<dyn TableBackend>, user: Option<User>) -> Context {
    let config = Config::parse("backend:\n  url: http://127.0.0.1:9\n").unwrap();
    let cache = memory_cache();
    let sessions = SessionStore::new(
      std::env::temp_dir()
        .join(format!("chatdeck-ctx-{}", std::process::id()))
        .join("session.json"),
    );
    let auth = Auth::new(
      AuthClient::new(&config.backend.url, "anon").unwrap(),
      sessions,
      cache.clone(),
    );
    Context::with_backend(config, user, backend, cache, auth)
  }
}

#[cfg(test)]
mod tests {
  use super::fixtures::context;
  use crate::testutil::{backends, seed_project, user};

  #[tokio::test]
  async fn test_project_sync_shares_cache() {
    let (memory, backend) = backends();
    seed_project(&memory, "u1", "Support Bot");
    let ctx = context(backend, Some(user("u1")));

    let mut first = ctx.project_sync();
    first.get_projects();
    first.settle().await;
    assert_eq!(first.projects().len(), 1);

    // Second consumer is answered from the shared cache
    let mut second = ctx.project_sync();
    second.get_projects();
    assert_eq!(second.projects().len(), 1);
    assert!(!second.is_loading());
  }

  #[tokio::test]
  async fn test_data_items_without_user_has_no_fetcher() {
    let (_memory, backend) = backends();
    let ctx = context(backend, None);
    assert!(ctx.data_items(None, None).fetcher().is_none());
  }
}
