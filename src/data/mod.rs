//! Knowledge-base data items: remote accessor, local store and filtering.

mod api;
mod filter;
mod store;

pub use api::DataApi;
pub use filter::{filter_and_sort, ItemFilter, SortBy};
pub use store::DataItems;
