//! Wire types for query parameters.
//!
//! The list endpoint's parameters are the de facto contract for
//! shareable/bookmarkable filter state: `search` (free text), `tags`
//! (comma-joined names), and `sort` (`newest`/`oldest`, omitted means
//! newest). Parsing here only splits and forwards; normalization and
//! defaulting belong to [`clipshelf_core::ListCriteria`].

use serde::Deserialize;

use clipshelf_core::ListCriteria;

/// Query parameters accepted by `GET /api/v1/videos`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListVideosQuery {
    /// Free-text title filter.
    pub search: Option<String>,
    /// Comma-joined tag names.
    pub tags: Option<String>,
    /// `newest` or `oldest`; anything else falls back to the default.
    pub sort: Option<String>,
}

impl ListVideosQuery {
    /// Convert into normalized list criteria.
    pub fn into_criteria(self) -> ListCriteria {
        let tags = self
            .tags
            .map(|t| {
                t.split(',')
                    .map(|s| s.to_string())
                    .filter(|s| !s.trim().is_empty())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        ListCriteria::from_raw(self.sort.as_deref(), self.search.as_deref(), tags)
    }
}
