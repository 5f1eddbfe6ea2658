//! Service layer for the API: business logic that sits between the
//! HTTP handlers and the database repositories.

pub mod list_cache;

pub use list_cache::{CacheStats, ListCache};
