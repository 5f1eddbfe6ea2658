//! Core traits for clipshelf abstractions.
//!
//! These traits define the store capability the catalog requires,
//! enabling pluggable backends and testability. The store must be
//! able to filter/sort/tag-join video queries, create records with
//! nested upsert-by-name tag association, and list distinct tags.

use async_trait::async_trait;
use uuid::Uuid;

use crate::criteria::ListCriteria;
use crate::error::Result;
use crate::models::{CreateVideoRequest, Tag, Video};

/// Repository for video query and creation.
#[async_trait]
pub trait VideoRepository: Send + Sync {
    /// Resolve normalized list criteria against the store.
    ///
    /// Implementations re-normalize at this boundary; callers must
    /// not rely on pre-validated input being trusted silently.
    async fn list(&self, criteria: ListCriteria) -> Result<Vec<Video>>;

    /// Fetch a single shaped video by id.
    async fn fetch(&self, id: Uuid) -> Result<Video>;

    /// Persist a new video plus its tag associations as one logical
    /// unit and return the fully shaped record. The store assigns
    /// identity and timestamps.
    async fn create(&self, req: CreateVideoRequest) -> Result<Video>;
}

/// Repository for tag operations.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a tag if it doesn't exist (upsert-by-name).
    async fn create(&self, name: &str) -> Result<()>;

    /// List all tags ordered by name, with per-tag video counts.
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Get all tag names for a video, in association order.
    async fn get_for_video(&self, video_id: Uuid) -> Result<Vec<String>>;
}
