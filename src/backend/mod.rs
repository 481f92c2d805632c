//! Remote table backend.
//!
//! The hosted backend exposes one collection per table with
//! `select/insert/update/delete` calls built from `eq` filters and an
//! optional ordering. Rows travel as JSON values; typed conversion happens
//! in the accessors.

#[cfg(test)]
pub mod memory;
mod rest;

pub use rest::RestBackend;

use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

/// Error code the backend returns when a single-row call matched nothing.
pub const NO_ROWS_CODE: &str = "PGRST116";

/// A boxed future resolving to a backend result.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, BackendError>> + Send>>;

/// Remote collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
  Projects,
  Contexts,
  Issues,
  Inquiries,
  Products,
}

impl Table {
  pub fn as_str(&self) -> &'static str {
    match self {
      Table::Projects => "projects",
      Table::Contexts => "contexts",
      Table::Issues => "issues",
      Table::Inquiries => "inquiries",
      Table::Products => "products",
    }
  }
}

/// Equality filter on one column
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
  pub column: String,
  pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
  pub column: String,
  pub ascending: bool,
}

/// Query against a single table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableQuery {
  pub table: Table,
  pub filters: Vec<Filter>,
  pub order: Option<Order>,
}

impl TableQuery {
  pub fn new(table: Table) -> Self {
    Self {
      table,
      filters: Vec::new(),
      order: None,
    }
  }

  pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
    self.filters.push(Filter {
      column: column.to_string(),
      value: value.into(),
    });
    self
  }

  pub fn order_desc(mut self, column: &str) -> Self {
    self.order = Some(Order {
      column: column.to_string(),
      ascending: false,
    });
    self
  }
}

/// Failure reported by the backend or the transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
  /// Backend error code, absent for transport failures
  pub code: Option<String>,
  pub message: String,
}

impl BackendError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      code: None,
      message: message.into(),
    }
  }

  pub fn with_code(code: &str, message: impl Into<String>) -> Self {
    Self {
      code: Some(code.to_string()),
      message: message.into(),
    }
  }

  /// True for the distinguished "no rows matched" error.
  pub fn is_no_rows(&self) -> bool {
    self.code.as_deref() == Some(NO_ROWS_CODE)
  }
}

/// Table operations against the hosted backend.
///
/// Returned futures own everything they need so callers can spawn them.
pub trait TableBackend: Send + Sync {
  /// All rows matching the query.
  fn select(&self, query: TableQuery) -> BoxFuture<Vec<Value>>;

  /// Exactly one row; zero (or several) matches yield `NO_ROWS_CODE`.
  fn select_single(&self, query: TableQuery) -> BoxFuture<Value>;

  /// Insert a row and return it as stored.
  fn insert(&self, table: Table, row: Value) -> BoxFuture<Value>;

  /// Patch the single row matching the query and return it as stored.
  fn update(&self, query: TableQuery, patch: Value) -> BoxFuture<Value>;

  /// Delete every row matching the query.
  fn delete(&self, query: TableQuery) -> BoxFuture<()>;
}
