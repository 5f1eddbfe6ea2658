//! Centralized default constants for clipshelf.
//!
//! **This module is the single source of truth** for shared default
//! values. All crates reference these constants instead of defining
//! their own magic numbers.

use std::time::Duration;

// =============================================================================
// FILTER INPUT
// =============================================================================

/// Quiet window for debounced search input. Only the last value seen
/// within a window this long is committed to the URL and the query.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

// =============================================================================
// LIST CACHE
// =============================================================================

/// Freshness window for cached list results. Within this window a
/// repeated request for the same key returns the cached value without
/// a store round-trip.
pub const LIST_CACHE_TTL: Duration = Duration::from_secs(300);

// =============================================================================
// SERVER
// =============================================================================

/// Default bind host for the API server.
pub const HOST: &str = "0.0.0.0";

/// Default bind port for the API server.
pub const PORT: u16 = 3000;

/// Default PostgreSQL connection URL.
pub const DATABASE_URL: &str = "postgres://localhost/clipshelf";
