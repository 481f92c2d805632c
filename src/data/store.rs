use std::future::Future;
use std::pin::Pin;
use tracing::{info, warn};

use super::api::DataApi;
use crate::auth::User;
use crate::error::AppError;
use crate::model::data_item::sort_newest_first;
use crate::model::{CreateDataInput, DataItem, DataType, DataUpdate};

pub type ItemsFuture = Pin<Box<dyn Future<Output = Result<Vec<DataItem>, AppError>> + Send>>;

/// Locally held data items for one user, optionally scoped to a project
/// and a type, kept in step with local mutations.
pub struct DataItems {
  user: Option<User>,
  project_id: Option<String>,
  item_type: Option<DataType>,
  api: DataApi,
  items: Vec<DataItem>,
  loading: bool,
  error: Option<String>,
}

impl DataItems {
  pub fn new(
    user: Option<User>,
    api: DataApi,
    project_id: Option<String>,
    item_type: Option<DataType>,
  ) -> Self {
    Self {
      user,
      project_id,
      item_type,
      api,
      items: Vec::new(),
      loading: false,
      error: None,
    }
  }

  pub fn items(&self) -> &[DataItem] {
    &self.items
  }

  pub fn is_loading(&self) -> bool {
    self.loading
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  /// Fetcher for the current scope, detached from `self` so its futures
  /// can be spawned. `None` without a user.
  pub fn fetcher(&self) -> Option<impl Fn() -> ItemsFuture + Send + Sync + 'static> {
    let user_id = self.user.as_ref()?.id.clone();
    let api = self.api.clone();
    let project_id = self.project_id.clone();
    let item_type = self.item_type;

    Some(move || {
      let api = api.clone();
      let user_id = user_id.clone();
      let project_id = project_id.clone();
      let fut: ItemsFuture =
        Box::pin(async move { api.list(&user_id, project_id.as_deref(), item_type).await });
      fut
    })
  }

  /// Mark a load as started, clearing the previous error.
  pub fn begin_load(&mut self) {
    if self.user.is_none() {
      self.items.clear();
      self.loading = false;
      return;
    }
    self.loading = true;
    self.error = None;
  }

  /// Apply the result of a load.
  pub fn finish_load(&mut self, result: Result<Vec<DataItem>, AppError>) {
    self.loading = false;
    match result {
      Ok(items) => self.items = items,
      Err(e) => {
        warn!("failed to fetch data items: {}", e);
        self.error = Some(e.to_string());
      }
    }
  }

  /// Reload the current scope.
  pub async fn refresh(&mut self) {
    self.begin_load();
    let Some(fetch) = self.fetcher() else {
      return;
    };
    let result = fetch().await;
    self.finish_load(result);
  }

  fn require_user(&self) -> Result<String, AppError> {
    self
      .user
      .as_ref()
      .map(|u| u.id.clone())
      .ok_or(AppError::NotAuthenticated)
  }

  pub async fn create(&mut self, input: CreateDataInput) -> Result<DataItem, AppError> {
    let user_id = self.require_user()?;
    let item = self.api.create(&user_id, input).await?;
    info!(id = %item.id, kind = item.item_type().as_str(), "created data item");

    self.items.insert(0, item.clone());
    sort_newest_first(&mut self.items);
    Ok(item)
  }

  pub async fn update(
    &mut self,
    id: &str,
    item_type: DataType,
    changes: DataUpdate,
  ) -> Result<DataItem, AppError> {
    self.require_user()?;
    let item = self.api.update(id, item_type, changes).await?;

    for existing in self.items.iter_mut().filter(|i| i.id == id) {
      *existing = item.clone();
    }
    Ok(item)
  }

  /// Delete by id. Without an explicit type it is taken from the loaded list.
  pub async fn delete(&mut self, id: &str, item_type: Option<DataType>) -> Result<(), AppError> {
    self.require_user()?;
    let item_type = item_type
      .or_else(|| {
        self
          .items
          .iter()
          .find(|i| i.id == id)
          .map(|i| i.item_type())
      })
      .ok_or_else(|| AppError::validation("Cannot determine data type for deletion"))?;

    self.api.delete(id, item_type).await?;
    info!(id, kind = item_type.as_str(), "deleted data item");
    self.items.retain(|i| i.id != id);
    Ok(())
  }
}
