//! Knowledge-base data items.
//!
//! The four variants live in separate tables with variant-specific columns.
//! In memory they share [`DataItem`] and carry the variant payload in
//! [`ItemKind`]. The loose `metadata` mapping used by forms and callers is
//! synthesized here at read time and flattened back at write time, so the
//! row shape never leaks past this module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::backend::Table;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
  Context,
  Issue,
  Inquiry,
  Product,
}

impl DataType {
  pub const ALL: [DataType; 4] = [
    DataType::Context,
    DataType::Issue,
    DataType::Inquiry,
    DataType::Product,
  ];

  pub fn table(&self) -> Table {
    match self {
      DataType::Context => Table::Contexts,
      DataType::Issue => Table::Issues,
      DataType::Inquiry => Table::Inquiries,
      DataType::Product => Table::Products,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      DataType::Context => "context",
      DataType::Issue => "issue",
      DataType::Inquiry => "inquiry",
      DataType::Product => "product",
    }
  }

  /// Display name used by tabs and headings
  pub fn label(&self) -> &'static str {
    match self {
      DataType::Context => "Context",
      DataType::Issue => "Issues",
      DataType::Inquiry => "Inquiries",
      DataType::Product => "Products",
    }
  }
}

impl std::str::FromStr for DataType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    DataType::ALL
      .into_iter()
      .find(|t| t.as_str() == s.trim().to_lowercase())
      .ok_or_else(|| format!("Unknown data type '{}'", s))
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Low,
  #[default]
  Medium,
  High,
  Critical,
}

impl Severity {
  pub fn as_str(&self) -> &'static str {
    match self {
      Severity::Low => "low",
      Severity::Medium => "medium",
      Severity::High => "high",
      Severity::Critical => "critical",
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueStatus {
  #[default]
  Open,
  InProgress,
  Resolved,
  Closed,
}

impl IssueStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      IssueStatus::Open => "open",
      IssueStatus::InProgress => "in-progress",
      IssueStatus::Resolved => "resolved",
      IssueStatus::Closed => "closed",
    }
  }
}

/// Variant payload of a data item
#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
  Context {
    content: Option<String>,
  },
  Issue {
    severity: Severity,
    status: IssueStatus,
  },
  Inquiry {
    content: Option<String>,
  },
  Product {
    price: Option<f64>,
    affiliate_link: Option<String>,
  },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataItem {
  pub id: String,
  pub title: String,
  pub description: Option<String>,
  pub file_url: Option<String>,
  pub file_name: Option<String>,
  pub file_size: Option<u64>,
  pub tags: Vec<String>,
  pub user_id: String,
  pub project_id: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub kind: ItemKind,
}

/// Union of every column the four item tables can return.
#[derive(Debug, Deserialize)]
struct ItemRow {
  id: String,
  title: String,
  description: Option<String>,
  content: Option<String>,
  file_url: Option<String>,
  file_name: Option<String>,
  file_size: Option<u64>,
  #[serde(default)]
  tags: Vec<String>,
  user_id: String,
  project_id: String,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
  #[serde(default)]
  severity: Severity,
  #[serde(default)]
  status: IssueStatus,
  price: Option<f64>,
  affiliate_link: Option<String>,
}

impl DataItem {
  /// Decode a row fetched from the table of `item_type`.
  pub fn from_row(item_type: DataType, row: Value) -> Result<Self, AppError> {
    let row: ItemRow = serde_json::from_value(row).map_err(|e| {
      AppError::Remote(format!("Failed to parse {} row: {}", item_type.as_str(), e))
    })?;

    let kind = match item_type {
      DataType::Context => ItemKind::Context {
        content: row.content,
      },
      DataType::Issue => ItemKind::Issue {
        severity: row.severity,
        status: row.status,
      },
      DataType::Inquiry => ItemKind::Inquiry {
        content: row.content,
      },
      DataType::Product => ItemKind::Product {
        price: row.price,
        affiliate_link: row.affiliate_link,
      },
    };

    Ok(Self {
      id: row.id,
      title: row.title,
      description: row.description,
      file_url: row.file_url,
      file_name: row.file_name,
      file_size: row.file_size,
      tags: row.tags,
      user_id: row.user_id,
      project_id: row.project_id,
      created_at: row.created_at,
      updated_at: row.updated_at,
      kind,
    })
  }

  pub fn item_type(&self) -> DataType {
    match self.kind {
      ItemKind::Context { .. } => DataType::Context,
      ItemKind::Issue { .. } => DataType::Issue,
      ItemKind::Inquiry { .. } => DataType::Inquiry,
      ItemKind::Product { .. } => DataType::Product,
    }
  }

  pub fn content(&self) -> Option<&str> {
    match &self.kind {
      ItemKind::Context { content } | ItemKind::Inquiry { content } => content.as_deref(),
      ItemKind::Issue { .. } | ItemKind::Product { .. } => None,
    }
  }

  /// Uniform metadata view: severity/status for issues, price and
  /// affiliate link for products, empty otherwise.
  pub fn metadata(&self) -> Map<String, Value> {
    let mut meta = Map::new();
    match &self.kind {
      ItemKind::Issue { severity, status } => {
        meta.insert("severity".into(), Value::String(severity.as_str().into()));
        meta.insert("status".into(), Value::String(status.as_str().into()));
      }
      ItemKind::Product {
        price,
        affiliate_link,
      } => {
        meta.insert("price".into(), price.map(Value::from).unwrap_or(Value::Null));
        meta.insert(
          "affiliateLink".into(),
          affiliate_link.clone().map(Value::String).unwrap_or(Value::Null),
        );
      }
      ItemKind::Context { .. } | ItemKind::Inquiry { .. } => {}
    }
    meta
  }
}

/// Sort newest first, stable for equal timestamps.
pub fn sort_newest_first(items: &mut [DataItem]) {
  items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Creation request as filled in by a form or the CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateDataInput {
  pub item_type: DataType,
  pub project_id: String,
  pub title: String,
  pub description: Option<String>,
  pub content: Option<String>,
  pub file_url: Option<String>,
  pub file_name: Option<String>,
  pub file_size: Option<u64>,
  pub tags: Vec<String>,
  pub metadata: Map<String, Value>,
}

impl CreateDataInput {
  pub fn new(item_type: DataType, project_id: impl Into<String>, title: impl Into<String>) -> Self {
    Self {
      item_type,
      project_id: project_id.into(),
      title: title.into(),
      description: None,
      content: None,
      file_url: None,
      file_name: None,
      file_size: None,
      tags: Vec::new(),
      metadata: Map::new(),
    }
  }

  pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
    self.metadata.insert(key.to_string(), value.into());
    self
  }

  /// Check mandatory fields and build the insert row for `user_id`.
  ///
  /// Nothing here touches the network, so a validation error means no
  /// request was made.
  pub fn into_row(self, user_id: &str) -> Result<Value, AppError> {
    if self.title.trim().is_empty() {
      return Err(AppError::validation("Please enter a title"));
    }
    if self.project_id.trim().is_empty() {
      return Err(AppError::validation("Please select a project"));
    }

    let mut row = Map::new();
    row.insert("title".into(), Value::String(self.title));
    row.insert(
      "description".into(),
      self.description.clone().map(Value::String).unwrap_or(Value::Null),
    );
    insert_opt(&mut row, "file_url", self.file_url.map(Value::String));
    insert_opt(&mut row, "file_name", self.file_name.map(Value::String));
    insert_opt(&mut row, "file_size", self.file_size.map(Value::from));
    row.insert(
      "tags".into(),
      Value::Array(self.tags.into_iter().map(Value::String).collect()),
    );
    row.insert("user_id".into(), Value::String(user_id.to_string()));
    row.insert("project_id".into(), Value::String(self.project_id));

    match self.item_type {
      DataType::Context => {
        insert_opt(&mut row, "content", self.content.map(Value::String));
      }
      DataType::Issue => {
        let severity: Severity = meta_enum(&self.metadata, "severity")
          .ok_or_else(|| AppError::validation("Please select a severity level"))?;
        // New issues start open unless a status is chosen
        let status = match meta_string(&self.metadata, "status") {
          None => IssueStatus::Open,
          Some(_) => meta_enum(&self.metadata, "status")
            .ok_or_else(|| AppError::validation("Please select a status"))?,
        };
        row.insert("severity".into(), Value::String(severity.as_str().into()));
        row.insert("status".into(), Value::String(status.as_str().into()));
      }
      DataType::Inquiry => {
        let description = self
          .description
          .filter(|d| !d.trim().is_empty())
          .ok_or_else(|| AppError::validation("Please enter a description for the inquiry"))?;
        row.insert("description".into(), Value::String(description));
        insert_opt(&mut row, "content", self.content.map(Value::String));
      }
      DataType::Product => {
        let price = meta_price(&self.metadata)
          .ok_or_else(|| AppError::validation("Please enter a price for the product"))?;
        row.insert("price".into(), Value::from(price));
        insert_opt(
          &mut row,
          "affiliate_link",
          meta_string(&self.metadata, "affiliateLink").map(Value::String),
        );
      }
    }

    Ok(Value::Object(row))
  }
}

/// Partial update of a data item. `metadata` is flattened into the
/// variant's columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataUpdate {
  pub title: Option<String>,
  pub description: Option<String>,
  pub content: Option<String>,
  pub file_url: Option<String>,
  pub file_name: Option<String>,
  pub file_size: Option<u64>,
  pub tags: Option<Vec<String>>,
  pub metadata: Option<Map<String, Value>>,
}

impl DataUpdate {
  pub fn into_row(self, item_type: DataType) -> Result<Value, AppError> {
    let mut row = Map::new();
    insert_opt(&mut row, "title", self.title.map(Value::String));
    insert_opt(&mut row, "description", self.description.map(Value::String));
    insert_opt(&mut row, "file_url", self.file_url.map(Value::String));
    insert_opt(&mut row, "file_name", self.file_name.map(Value::String));
    insert_opt(&mut row, "file_size", self.file_size.map(Value::from));
    if let Some(tags) = self.tags {
      row.insert(
        "tags".into(),
        Value::Array(tags.into_iter().map(Value::String).collect()),
      );
    }

    match item_type {
      DataType::Context | DataType::Inquiry => {
        insert_opt(&mut row, "content", self.content.map(Value::String));
      }
      DataType::Issue => {
        if let Some(meta) = &self.metadata {
          if meta.contains_key("severity") {
            let severity: Severity = meta_enum(meta, "severity")
              .ok_or_else(|| AppError::validation("Please select a severity level"))?;
            row.insert("severity".into(), Value::String(severity.as_str().into()));
          }
          if meta.contains_key("status") {
            let status: IssueStatus = meta_enum(meta, "status")
              .ok_or_else(|| AppError::validation("Please select a status"))?;
            row.insert("status".into(), Value::String(status.as_str().into()));
          }
        }
      }
      DataType::Product => {
        if let Some(meta) = &self.metadata {
          if meta.contains_key("price") {
            let price = meta_price(meta)
              .ok_or_else(|| AppError::validation("Please enter a price for the product"))?;
            row.insert("price".into(), Value::from(price));
          }
          if let Some(link) = meta.get("affiliateLink") {
            row.insert("affiliate_link".into(), link.clone());
          }
        }
      }
    }

    Ok(Value::Object(row))
  }
}

fn insert_opt(row: &mut Map<String, Value>, key: &str, value: Option<Value>) {
  if let Some(value) = value {
    row.insert(key.to_string(), value);
  }
}

fn meta_string(meta: &Map<String, Value>, key: &str) -> Option<String> {
  meta
    .get(key)
    .and_then(Value::as_str)
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(String::from)
}

fn meta_enum<T: serde::de::DeserializeOwned>(meta: &Map<String, Value>, key: &str) -> Option<T> {
  let value = meta_string(meta, key)?;
  serde_json::from_value(Value::String(value.to_lowercase())).ok()
}

/// Price as a number; numeric strings from text inputs are accepted.
fn meta_price(meta: &Map<String, Value>) -> Option<f64> {
  let price = match meta.get("price")? {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse::<f64>().ok(),
    _ => None,
  };
  price.filter(|p| p.is_finite())
}
