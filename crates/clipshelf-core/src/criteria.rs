//! List-query criteria: schema, normalization, and cache-key derivation.
//!
//! Criteria double as cache keys, so normalization must be idempotent
//! and deterministic: two logically equal queries have to produce
//! byte-equal normalized values no matter how the caller spelled them.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Sort order for video listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum SortOrder {
    /// Descending by creation instant.
    #[default]
    Newest,

    /// Ascending by creation instant.
    Oldest,
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Newest => write!(f, "newest"),
            Self::Oldest => write!(f, "oldest"),
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            _ => Err(format!("Invalid sort order: {}", s)),
        }
    }
}

impl SortOrder {
    /// Parse a raw value, falling back to the default for anything
    /// absent or unrecognized. List criteria never reject a sort
    /// value; they normalize it.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or_default()
    }
}

/// Normalize a free-text search query: trim, then lowercase.
///
/// Idempotent: `normalize_search(normalize_search(s)) == normalize_search(s)`.
pub fn normalize_search(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalize a single tag name: trim, then lowercase.
pub fn normalize_tag(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalized criteria for a video list query.
///
/// Construct via [`ListCriteria::new`] or [`ListCriteria::from_raw`];
/// both normalize. The query executor re-normalizes at its boundary
/// anyway, so a hand-built value cannot smuggle un-normalized text
/// into the store or the cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ListCriteria {
    pub order_by: SortOrder,
    /// Trimmed, lowercased; empty matches all titles.
    pub search_query: String,
    /// Normalized tag names; empty means no tag filter. A video
    /// matches when it carries at least one of these (union).
    pub tags: Vec<String>,
}

impl ListCriteria {
    pub fn new(
        order_by: SortOrder,
        search_query: impl AsRef<str>,
        tags: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Self {
        Self {
            order_by,
            search_query: search_query.as_ref().to_string(),
            tags: tags.into_iter().map(|t| t.as_ref().to_string()).collect(),
        }
        .normalized()
    }

    /// Build criteria from raw, possibly missing wire values.
    pub fn from_raw(sort: Option<&str>, search: Option<&str>, tags: Vec<String>) -> Self {
        Self {
            order_by: SortOrder::parse_or_default(sort),
            search_query: search.unwrap_or_default().to_string(),
            tags,
        }
        .normalized()
    }

    /// Apply the normalization rules: search trimmed + lowercased,
    /// each tag trimmed + lowercased, empty tags dropped. Idempotent.
    pub fn normalized(mut self) -> Self {
        self.search_query = normalize_search(&self.search_query);
        self.tags = self
            .tags
            .iter()
            .map(|t| normalize_tag(t))
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    /// Derive the canonical cache key for these criteria.
    ///
    /// The key hashes the sort order, the normalized search string,
    /// and the tag set sorted and deduplicated, so set-equal tag
    /// inputs hash identically regardless of order or repetition.
    /// Keys live under the `videos:` namespace so coarse invalidation
    /// can clear every list entry at once.
    pub fn cache_key(&self) -> String {
        let normalized = self.clone().normalized();

        let mut sorted_tags = normalized.tags.clone();
        sorted_tags.sort();
        sorted_tags.dedup();

        let mut hasher = Sha256::new();
        hasher.update(normalized.order_by.to_string().as_bytes());
        hasher.update([0u8]);
        hasher.update(normalized.search_query.as_bytes());
        for tag in &sorted_tags {
            hasher.update([0u8]);
            hasher.update(tag.as_bytes());
        }

        let hash = hex::encode(hasher.finalize());
        format!("{}{}", CACHE_NAMESPACE, &hash[..16])
    }
}

/// Namespace prefix for list-query cache keys.
pub const CACHE_NAMESPACE: &str = "videos:";
