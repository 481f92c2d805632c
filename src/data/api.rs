use futures::future::try_join_all;
use std::sync::Arc;
use tracing::debug;

use crate::backend::{TableBackend, TableQuery};
use crate::error::AppError;
use crate::model::data_item::sort_newest_first;
use crate::model::{CreateDataInput, DataItem, DataType, DataUpdate};

const ITEM_NOT_FOUND: &str = "Data item not found";

/// Remote accessor for the four data item tables.
#[derive(Clone)]
pub struct DataApi {
  backend: Arc<dyn TableBackend>,
}

impl DataApi {
  pub fn new(backend: Arc<dyn TableBackend>) -> Self {
    Self { backend }
  }

  /// Items of `user_id`, optionally narrowed to one project and one type.
  ///
  /// Without a type every table is queried concurrently; the merged list is
  /// re-sorted newest first.
  pub async fn list(
    &self,
    user_id: &str,
    project_id: Option<&str>,
    item_type: Option<DataType>,
  ) -> Result<Vec<DataItem>, AppError> {
    let types: Vec<DataType> = match item_type {
      Some(t) => vec![t],
      None => DataType::ALL.to_vec(),
    };

    let fetches = types.into_iter().map(|t| {
      let mut query = TableQuery::new(t.table()).eq("user_id", user_id);
      if let Some(project_id) = project_id {
        query = query.eq("project_id", project_id);
      }
      let rows = self.backend.select(query.order_desc("created_at"));
      async move {
        let rows = rows.await?;
        rows
          .into_iter()
          .map(|row| DataItem::from_row(t, row))
          .collect::<Result<Vec<_>, AppError>>()
      }
    });

    let mut items: Vec<DataItem> = try_join_all(fetches).await?.into_iter().flatten().collect();
    sort_newest_first(&mut items);
    debug!(user = user_id, project = ?project_id, count = items.len(), "fetched data items");
    Ok(items)
  }

  /// Validate and insert. Validation failures never reach the backend.
  pub async fn create(&self, user_id: &str, input: CreateDataInput) -> Result<DataItem, AppError> {
    let item_type = input.item_type;
    let row = input.into_row(user_id)?;
    let created = self.backend.insert(item_type.table(), row).await?;
    DataItem::from_row(item_type, created)
  }

  pub async fn update(
    &self,
    id: &str,
    item_type: DataType,
    changes: DataUpdate,
  ) -> Result<DataItem, AppError> {
    let patch = changes.into_row(item_type)?;
    let row = self
      .backend
      .update(TableQuery::new(item_type.table()).eq("id", id), patch)
      .await
      .map_err(|e| AppError::from_backend(e, ITEM_NOT_FOUND))?;
    DataItem::from_row(item_type, row)
  }

  pub async fn delete(&self, id: &str, item_type: DataType) -> Result<(), AppError> {
    self
      .backend
      .delete(TableQuery::new(item_type.table()).eq("id", id))
      .await?;
    Ok(())
  }
}
