//! Error taxonomy for remote reads and mutations.
//!
//! `Display` is the user-facing message. Mutations hand these back to the
//! caller instead of raising, and the caller decides whether to notify.

use crate::backend::BackendError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
  /// No session; nothing was sent over the network
  #[error("User not authenticated")]
  NotAuthenticated,

  /// The backend matched no rows
  #[error("{0}")]
  NotFound(String),

  /// A required field was missing or malformed; caught before any request
  #[error("{0}")]
  Validation(String),

  /// Any other backend or transport failure
  #[error("{0}")]
  Remote(String),
}

impl AppError {
  pub fn validation(msg: impl Into<String>) -> Self {
    Self::Validation(msg.into())
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound(_))
  }

  /// Map a backend failure, replacing the generic "no rows" text with
  /// a message that names what was missing.
  pub fn from_backend(err: BackendError, not_found: &str) -> Self {
    if err.is_no_rows() {
      Self::NotFound(not_found.to_string())
    } else {
      Self::Remote(err.message)
    }
  }
}

impl From<BackendError> for AppError {
  fn from(err: BackendError) -> Self {
    if err.is_no_rows() {
      Self::NotFound(err.message)
    } else {
      Self::Remote(err.message)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_no_rows_maps_to_not_found() {
    let err = BackendError::with_code("PGRST116", "JSON object requested, multiple (or no) rows returned");
    let mapped = AppError::from_backend(err, "Project not found");
    assert_eq!(mapped, AppError::NotFound("Project not found".to_string()));
    assert!(mapped.is_not_found());
  }

  #[test]
  fn test_other_codes_keep_message() {
    let err = BackendError::with_code("42501", "permission denied for table projects");
    let mapped: AppError = err.into();
    assert_eq!(mapped.to_string(), "permission denied for table projects");
    assert!(!mapped.is_not_found());
  }

  #[test]
  fn test_not_authenticated_message() {
    assert_eq!(AppError::NotAuthenticated.to_string(), "User not authenticated");
  }
}
