//! Chatbot projects: the remote accessor and the cached sync policy on top.

mod api;
mod sync;

pub use api::ProjectsApi;
pub use sync::{LoadStatus, ProjectSync, CACHE_DURATION, MIN_LOADING_TIME};
