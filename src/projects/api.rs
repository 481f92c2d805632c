use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::backend::{Table, TableBackend, TableQuery};
use crate::error::AppError;
use crate::model::{NewProject, Project, ProjectUpdate};

const PROJECT_NOT_FOUND: &str = "Project not found";
const PUBLIC_NOT_FOUND: &str = "Chatbot not found or not publicly available";

/// Remote accessor for the `projects` table.
#[derive(Clone)]
pub struct ProjectsApi {
  backend: Arc<dyn TableBackend>,
}

impl ProjectsApi {
  pub fn new(backend: Arc<dyn TableBackend>) -> Self {
    Self { backend }
  }

  /// Every project owned by `user_id`, newest first.
  pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Project>, AppError> {
    let query = TableQuery::new(Table::Projects)
      .eq("user_id", user_id)
      .order_desc("created_at");

    let rows = self.backend.select(query).await?;
    debug!(user = user_id, count = rows.len(), "fetched projects");
    rows.into_iter().map(decode).collect()
  }

  /// Insert a project for `user_id`. The slug is derived from the name
  /// unless one was given.
  pub async fn create(&self, user_id: &str, project: NewProject) -> Result<Project, AppError> {
    if project.name.trim().is_empty() {
      return Err(AppError::validation("Please enter a project name"));
    }

    let row = self
      .backend
      .insert(Table::Projects, project.into_row(user_id))
      .await?;
    decode(row)
  }

  pub async fn update(&self, id: &str, changes: ProjectUpdate) -> Result<Project, AppError> {
    if changes.is_empty() {
      return Err(AppError::validation("No changes to save"));
    }

    let patch = serde_json::to_value(&changes)
      .map_err(|e| AppError::Remote(format!("Failed to encode project update: {}", e)))?;
    let row = self
      .backend
      .update(TableQuery::new(Table::Projects).eq("id", id), patch)
      .await
      .map_err(|e| AppError::from_backend(e, PROJECT_NOT_FOUND))?;
    decode(row)
  }

  pub async fn delete(&self, id: &str) -> Result<(), AppError> {
    self
      .backend
      .delete(TableQuery::new(Table::Projects).eq("id", id))
      .await?;
    Ok(())
  }

  /// The project of `user_id` with the given generated slug.
  pub async fn by_slug(&self, user_id: &str, slug: &str) -> Result<Project, AppError> {
    let query = TableQuery::new(Table::Projects)
      .eq("user_id", user_id)
      .eq("slug", slug);

    let row = self
      .backend
      .select_single(query)
      .await
      .map_err(|e| AppError::from_backend(e, PROJECT_NOT_FOUND))?;
    decode(row)
  }

  /// Look up a public chat page. A custom slug wins over the generated one.
  pub async fn public_by_slug(&self, slug: &str) -> Result<Project, AppError> {
    for column in ["custom_slug", "slug"] {
      let query = TableQuery::new(Table::Projects)
        .eq(column, slug)
        .eq("is_public", true);

      match self.backend.select_single(query).await {
        Ok(row) => return decode(row),
        Err(e) if e.is_no_rows() => continue,
        Err(e) => return Err(e.into()),
      }
    }

    Err(AppError::NotFound(PUBLIC_NOT_FOUND.to_string()))
  }
}

fn decode(row: Value) -> Result<Project, AppError> {
  serde_json::from_value(row)
    .map_err(|e| AppError::Remote(format!("Failed to parse project: {}", e)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::memory::Op;
  use crate::backend::BackendError;
  use crate::testutil::{backends, seed_project};
  use serde_json::json;

  #[tokio::test]
  async fn test_list_is_scoped_and_newest_first() {
    let (memory, backend) = backends();
    seed_project(&memory, "u1", "First");
    seed_project(&memory, "u2", "Foreign");
    seed_project(&memory, "u1", "Second");

    let projects = ProjectsApi::new(backend).list_for_user("u1").await.unwrap();
    let names: Vec<&str> = projects.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Second", "First"]);
  }

  #[tokio::test]
  async fn test_create_derives_slug_from_name() {
    let (memory, backend) = backends();
    let api = ProjectsApi::new(backend);

    let project = api
      .create("u1", NewProject::new("My Cool Bot!", "desc"))
      .await
      .unwrap();
    assert_eq!(project.slug, "my-cool-bot");
    assert_eq!(project.user_id, "u1");
    assert_eq!(memory.rows(Table::Projects).len(), 1);
  }

  #[tokio::test]
  async fn test_create_keeps_explicit_slugs() {
    let (_memory, backend) = backends();
    let api = ProjectsApi::new(backend);

    let mut new = NewProject::new("Support Bot", "");
    new.slug = Some("Support_Bot".to_string());
    new.custom_slug = Some("Help Desk".to_string());

    let project = api.create("u1", new).await.unwrap();
    assert_eq!(project.slug, "Support_Bot");
    assert_eq!(project.custom_slug.as_deref(), Some("Help Desk"));
  }

  #[tokio::test]
  async fn test_create_without_name_sends_nothing() {
    let (memory, backend) = backends();
    let err = ProjectsApi::new(backend)
      .create("u1", NewProject::new("  ", ""))
      .await
      .unwrap_err();

    assert_eq!(err.to_string(), "Please enter a project name");
    assert_eq!(memory.total_calls(), 0);
  }

  #[tokio::test]
  async fn test_update_missing_row_is_not_found() {
    let (_memory, backend) = backends();
    let changes = ProjectUpdate {
      name: Some("Renamed".to_string()),
      ..ProjectUpdate::default()
    };

    let err = ProjectsApi::new(backend)
      .update("nope", changes)
      .await
      .unwrap_err();
    assert_eq!(err, AppError::NotFound("Project not found".to_string()));
  }

  #[tokio::test]
  async fn test_update_patches_row() {
    let (memory, backend) = backends();
    let row = seed_project(&memory, "u1", "Old");
    let id = row["id"].as_str().unwrap();

    let changes = ProjectUpdate {
      name: Some("New".to_string()),
      is_public: Some(true),
      ..ProjectUpdate::default()
    };
    let project = ProjectsApi::new(backend).update(id, changes).await.unwrap();
    assert_eq!(project.name, "New");
    assert!(project.is_public);
    assert!(project.updated_at > project.created_at);
  }

  #[tokio::test]
  async fn test_public_lookup_prefers_custom_slug() {
    let (memory, backend) = backends();
    memory.seed(
      Table::Projects,
      json!({"name": "Generated", "user_id": "u1", "slug": "help", "is_public": true}),
    );
    memory.seed(
      Table::Projects,
      json!({"name": "Custom", "user_id": "u2", "slug": "custom", "custom_slug": "help", "is_public": true}),
    );

    let project = ProjectsApi::new(backend).public_by_slug("help").await.unwrap();
    assert_eq!(project.name, "Custom");
  }

  #[tokio::test]
  async fn test_public_lookup_falls_back_to_slug() {
    let (memory, backend) = backends();
    memory.seed(
      Table::Projects,
      json!({"name": "Shop", "user_id": "u1", "slug": "shop", "is_public": true}),
    );

    let project = ProjectsApi::new(backend).public_by_slug("shop").await.unwrap();
    assert_eq!(project.name, "Shop");
    assert_eq!(memory.calls(Table::Projects, Op::SelectSingle), 2);
  }

  #[tokio::test]
  async fn test_private_project_is_not_public() {
    let (memory, backend) = backends();
    seed_project(&memory, "u1", "Hidden");

    let err = ProjectsApi::new(backend)
      .public_by_slug("hidden")
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), "Chatbot not found or not publicly available");
  }

  #[tokio::test]
  async fn test_public_lookup_surfaces_other_errors() {
    let (memory, backend) = backends();
    memory.fail_with(Some(BackendError::new("connection refused")));

    let err = ProjectsApi::new(backend)
      .public_by_slug("any")
      .await
      .unwrap_err();
    assert_eq!(err, AppError::Remote("connection refused".to_string()));
    assert_eq!(memory.calls(Table::Projects, Op::SelectSingle), 1);
  }

  #[tokio::test]
  async fn test_by_slug_is_owner_scoped() {
    let (memory, backend) = backends();
    seed_project(&memory, "u2", "Theirs");
    let api = ProjectsApi::new(backend);

    let err = api.by_slug("u1", "theirs").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(api.by_slug("u2", "theirs").await.unwrap().name, "Theirs");
  }
}
