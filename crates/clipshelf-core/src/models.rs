//! Core data models for clipshelf.
//!
//! These types are shared across all clipshelf crates and represent
//! the public shapes produced by the query and creation paths.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog video as returned by list queries and creation.
///
/// `tags` carries the flattened tag names in association order
/// (insertion order at creation time); a video without tags has an
/// empty vector, never a missing field.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Video {
    pub id: Uuid,
    pub title: String,
    pub thumbnail_url: String,
    /// Length in whole seconds, at least 1.
    pub duration_seconds: i32,
    pub views: i64,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
    pub tags: Vec<String>,
}

/// A tag record. `name` is the natural key, stored lowercase.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Tag {
    pub name: String,
    pub created_at_utc: DateTime<Utc>,
    /// Number of videos carrying this tag (computed)
    #[serde(default)]
    pub video_count: i64,
}

/// Response for listing videos.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ListVideosResponse {
    pub videos: Vec<Video>,
    pub total: i64,
}

/// Validated input for creating a video.
///
/// Produced by [`crate::validate::RawVideoInput::validate`]; constructing
/// one directly bypasses coercion but still goes through the store-side
/// tag normalization, so repository code treats its fields as trusted
/// except for tag casing.
#[derive(Debug, Clone)]
pub struct CreateVideoRequest {
    pub title: String,
    pub thumbnail_url: String,
    pub duration_seconds: i32,
    pub views: i64,
    /// Raw tag names; lowercased and deduplicated at the persistence
    /// boundary, not here.
    pub tags: Vec<String>,
}
