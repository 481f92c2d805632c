//! Domain types shared by the accessors, the cache and the UI.

pub mod data_item;
pub mod project;
pub mod slug;

pub use data_item::{
  CreateDataInput, DataItem, DataType, DataUpdate, IssueStatus, ItemKind, Severity,
};
pub use project::{NewProject, Plan, Project, ProjectUpdate};
pub use slug::slugify;
