use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::slug::slugify;

/// Subscription plan of a chatbot project
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
  #[default]
  Personal,
  Creator,
  Business,
}

impl Plan {
  pub fn as_str(&self) -> &'static str {
    match self {
      Plan::Personal => "personal",
      Plan::Creator => "creator",
      Plan::Business => "business",
    }
  }
}

impl std::str::FromStr for Plan {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "personal" => Ok(Plan::Personal),
      "creator" => Ok(Plan::Creator),
      "business" => Ok(Plan::Business),
      other => Err(format!("Unknown plan '{}'", other)),
    }
  }
}

/// A chatbot project as stored in the `projects` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub plan: Plan,
  #[serde(default)]
  pub social_links: Option<Map<String, Value>>,
  pub user_id: String,
  pub slug: String,
  #[serde(default)]
  pub is_public: bool,
  #[serde(default)]
  pub custom_slug: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Project {
  /// Slug used for the public chat page: the custom one when set.
  pub fn public_slug(&self) -> &str {
    self
      .custom_slug
      .as_deref()
      .filter(|s| !s.is_empty())
      .unwrap_or(&self.slug)
  }
}

/// Sort newest first. Stable, so equal timestamps keep their relative order.
pub fn sort_newest_first(projects: &mut [Project]) {
  projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Fields accepted when creating a project. The owner is added by the accessor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewProject {
  pub name: String,
  pub description: String,
  pub plan: Option<Plan>,
  pub is_public: bool,
  /// Explicit slug; derived from the name when absent
  pub slug: Option<String>,
  pub custom_slug: Option<String>,
  pub social_links: Option<Map<String, Value>>,
}

impl NewProject {
  pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      description: description.into(),
      ..Self::default()
    }
  }

  /// The slug to store: the explicit one verbatim, otherwise `slugify(name)`.
  pub fn resolved_slug(&self) -> String {
    match self.slug.as_deref() {
      Some(slug) if !slug.is_empty() => slug.to_string(),
      _ => slugify(&self.name),
    }
  }

  /// Row sent to the backend on insert.
  pub fn into_row(self, user_id: &str) -> Value {
    let slug = self.resolved_slug();
    let mut row = Map::new();
    row.insert("name".into(), Value::String(self.name));
    row.insert("description".into(), Value::String(self.description));
    if let Some(plan) = self.plan {
      row.insert("plan".into(), Value::String(plan.as_str().to_string()));
    }
    row.insert("is_public".into(), Value::Bool(self.is_public));
    row.insert("slug".into(), Value::String(slug));
    if let Some(custom) = self.custom_slug {
      row.insert("custom_slug".into(), Value::String(custom));
    }
    if let Some(links) = self.social_links {
      row.insert("social_links".into(), Value::Object(links));
    }
    row.insert("user_id".into(), Value::String(user_id.to_string()));
    Value::Object(row)
  }
}

/// Partial update of a project. `None` leaves a column untouched;
/// `Some(None)` on `custom_slug` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub plan: Option<Plan>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_public: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub slug: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub custom_slug: Option<Option<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub social_links: Option<Map<String, Value>>,
}

impl ProjectUpdate {
  pub fn is_empty(&self) -> bool {
    *self == Self::default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_slug_derived_from_name() {
    let project = NewProject::new("My Support Bot", "Answers questions");
    let row = project.into_row("user-1");
    assert_eq!(row["slug"], "my-support-bot");
    assert_eq!(row["user_id"], "user-1");
    assert!(row.get("custom_slug").is_none());
  }

  #[test]
  fn test_explicit_slugs_preserved_verbatim() {
    let project = NewProject {
      slug: Some("Keep_This".to_string()),
      custom_slug: Some("My-Custom Slug".to_string()),
      ..NewProject::new("Bot", "")
    };
    let row = project.into_row("user-1");
    assert_eq!(row["slug"], "Keep_This");
    assert_eq!(row["custom_slug"], "My-Custom Slug");
  }

  #[test]
  fn test_empty_explicit_slug_falls_back_to_name() {
    let project = NewProject {
      slug: Some(String::new()),
      ..NewProject::new("Shop Helper", "")
    };
    assert_eq!(project.resolved_slug(), "shop-helper");
  }

  #[test]
  fn test_project_row_defaults() {
    let project: Project = serde_json::from_value(json!({
      "id": "p1",
      "name": "Bot",
      "user_id": "u1",
      "slug": "bot",
      "created_at": "2024-03-01T10:00:00.123456+00:00",
      "updated_at": "2024-03-01T10:00:00+00:00"
    }))
    .unwrap();
    assert_eq!(project.plan, Plan::Personal);
    assert!(!project.is_public);
    assert_eq!(project.public_slug(), "bot");
  }

  #[test]
  fn test_update_serializes_only_set_fields() {
    let update = ProjectUpdate {
      name: Some("Renamed".to_string()),
      custom_slug: Some(None),
      ..ProjectUpdate::default()
    };
    assert_eq!(
      serde_json::to_value(&update).unwrap(),
      json!({"name": "Renamed", "custom_slug": null})
    );
    assert!(ProjectUpdate::default().is_empty());
  }

  #[test]
  fn test_plan_parse() {
    assert_eq!("Creator".parse::<Plan>(), Ok(Plan::Creator));
    assert!("enterprise".parse::<Plan>().is_err());
  }
}
