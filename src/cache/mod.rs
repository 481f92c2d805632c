//! Client-side caching of project lists.
//!
//! - `store`: persisted key-value storage (SQLite, or nothing)
//! - `registry`: in-memory map from user to cached projects
//! - `projects`: the cache service combining both layers

mod projects;
mod registry;
mod store;

pub use projects::ProjectCache;
pub use registry::CachedProjects;
pub use store::{NoopStore, PersistedStore, SqliteStore};
