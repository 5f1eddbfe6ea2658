//! Filter-form state and its URL query-string codec.
//!
//! The browsing UI keeps three pieces of filter state — search text,
//! sort order, and the selected tag set — and mirrors them into the
//! page URL so views stay shareable and bookmarkable. This module is
//! the framework-free half of that feature: an explicit state object
//! with pure transitions, plus the serialization rules for the
//! query-string contract.
//!
//! ## Query-parameter contract
//!
//! | param    | meaning                | encoding                              |
//! |----------|------------------------|---------------------------------------|
//! | `search` | free-text title filter | raw string, URL-encoded               |
//! | `tags`   | tag filter set         | comma-joined, sorted, lowercase names |
//! | `sort`   | sort order             | `newest` or `oldest`; omitted = newest|
//!
//! A parameter is omitted entirely when its value equals the default,
//! keeping the default view's URL clean.

use crate::criteria::{normalize_tag, ListCriteria, SortOrder};

/// Query-parameter name for the free-text title filter.
pub const PARAM_SEARCH: &str = "search";

/// Query-parameter name for the comma-joined tag set.
pub const PARAM_TAGS: &str = "tags";

/// Query-parameter name for the sort order.
pub const PARAM_SORT: &str = "sort";

/// Editable filter state with pure transition functions.
///
/// Text edits are expected to flow through
/// [`crate::debounce::channel`] before being committed to a URL or a
/// query; sort and tag changes are discrete selections and commit
/// immediately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterForm {
    search: String,
    sort: SortOrder,
    tags: Vec<String>,
    dirty: bool,
}

impl FilterForm {
    /// Read initial state from parsed query-string pairs (done once at
    /// mount). Missing params fall back to the normalizer defaults.
    pub fn from_query_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut form = Self::default();
        for (key, value) in pairs {
            match key {
                PARAM_SEARCH => form.search = value.to_string(),
                PARAM_SORT => form.sort = SortOrder::parse_or_default(Some(value)),
                PARAM_TAGS => {
                    form.tags = value
                        .split(',')
                        .map(normalize_tag)
                        .filter(|t| !t.is_empty())
                        .collect();
                }
                _ => {}
            }
        }
        form
    }

    /// Parse a full query string (with or without a leading `?`).
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs: Vec<(String, String)> = query
            .split('&')
            .filter(|p| !p.is_empty())
            .map(|pair| {
                let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                (
                    urlencoding::decode(k).map(|c| c.into_owned()).unwrap_or_default(),
                    urlencoding::decode(v).map(|c| c.into_owned()).unwrap_or_default(),
                )
            })
            .collect();
        Self::from_query_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// True once any field moved away from its initial state.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Replace the search text. Continuous input: callers debounce
    /// before committing downstream.
    pub fn set_search(&mut self, value: impl Into<String>) {
        self.search = value.into();
        self.dirty = true;
    }

    /// Replace the sort order. Commits immediately (no debounce).
    pub fn set_sort(&mut self, sort: SortOrder) {
        self.sort = sort;
        self.dirty = true;
    }

    /// Add the tag if absent, remove it if present. Commits
    /// immediately (no debounce). The name is normalized first so
    /// `Rust` and ` rust ` toggle the same selection.
    pub fn toggle_tag(&mut self, name: &str) {
        let name = normalize_tag(name);
        if name.is_empty() {
            return;
        }
        if let Some(idx) = self.tags.iter().position(|t| *t == name) {
            self.tags.remove(idx);
        } else {
            self.tags.push(name);
        }
        self.dirty = true;
    }

    /// Restore all three fields to their defaults in one transition.
    pub fn reset(&mut self) {
        *self = Self {
            dirty: true,
            ..Self::default()
        };
    }

    /// Serialize to the canonical query string, omitting defaults.
    ///
    /// The committed search text is passed in by the caller because
    /// the URL reflects the *debounced* value, which may lag the
    /// editable field.
    pub fn to_query_string_with_search(&self, committed_search: &str) -> String {
        let mut params: Vec<String> = Vec::new();

        let search = committed_search.trim();
        if !search.is_empty() {
            params.push(format!("{}={}", PARAM_SEARCH, urlencoding::encode(search)));
        }

        if !self.tags.is_empty() {
            let mut sorted: Vec<String> = self.tags.iter().map(|t| normalize_tag(t)).collect();
            sorted.sort();
            sorted.dedup();
            params.push(format!("{}={}", PARAM_TAGS, sorted.join(",")));
        }

        if self.sort != SortOrder::default() {
            params.push(format!("{}={}", PARAM_SORT, self.sort));
        }

        params.join("&")
    }

    /// Serialize using the live (undebounced) search text.
    pub fn to_query_string(&self) -> String {
        self.to_query_string_with_search(&self.search)
    }

    /// Build normalized list criteria from the committed search text
    /// plus the immediate sort/tag selections.
    pub fn criteria(&self, committed_search: &str) -> ListCriteria {
        ListCriteria::new(self.sort, committed_search, self.tags.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_query_pairs_defaults_when_absent() {
        let form = FilterForm::from_query_pairs(Vec::<(&str, &str)>::new());
        assert_eq!(form.search(), "");
        assert_eq!(form.sort(), SortOrder::Newest);
        assert!(form.tags().is_empty());
        assert!(!form.is_dirty());
    }

    #[test]
    fn test_from_query_string_parses_all_params() {
        let form = FilterForm::from_query_string("?search=my%20video&tags=a,b&sort=oldest");
        assert_eq!(form.search(), "my video");
        assert_eq!(form.sort(), SortOrder::Oldest);
        assert_eq!(form.tags(), ["a", "b"]);
    }

    #[test]
    fn test_from_query_string_ignores_unknown_and_bad_sort() {
        let form = FilterForm::from_query_string("page=3&sort=bogus&tags=,,x,");
        assert_eq!(form.sort(), SortOrder::Newest);
        assert_eq!(form.tags(), ["x"]);
    }

    #[test]
    fn test_default_state_serializes_to_empty_query() {
        assert_eq!(FilterForm::default().to_query_string(), "");
    }

    #[test]
    fn test_serialization_omits_default_fields() {
        let mut form = FilterForm::default();
        form.set_sort(SortOrder::Oldest);
        assert_eq!(form.to_query_string(), "sort=oldest");

        form.set_sort(SortOrder::Newest);
        form.set_search("cats");
        assert_eq!(form.to_query_string(), "search=cats");
    }

    #[test]
    fn test_tags_serialize_sorted_and_joined() {
        let mut form = FilterForm::default();
        form.toggle_tag("Zebra");
        form.toggle_tag(" alpha ");
        assert_eq!(form.to_query_string(), "tags=alpha,zebra");
    }

    #[test]
    fn test_search_is_percent_encoded() {
        let mut form = FilterForm::default();
        form.set_search("rust & async");
        assert_eq!(form.to_query_string(), "search=rust%20%26%20async");
    }

    #[test]
    fn test_toggle_tag_adds_then_removes() {
        let mut form = FilterForm::default();
        form.toggle_tag("Rust");
        assert_eq!(form.tags(), ["rust"]);
        form.toggle_tag(" rust ");
        assert!(form.tags().is_empty());
    }

    #[test]
    fn test_reset_restores_defaults_in_one_transition() {
        let mut form = FilterForm::from_query_string("search=x&tags=a&sort=oldest");
        form.reset();
        assert_eq!(form.search(), "");
        assert_eq!(form.sort(), SortOrder::Newest);
        assert!(form.tags().is_empty());
        assert!(form.is_dirty());
        assert_eq!(form.to_query_string(), "");
    }

    #[test]
    fn test_committed_search_lags_live_field() {
        let mut form = FilterForm::default();
        form.set_search("typing in progr");
        // URL still reflects the last debounced commit
        assert_eq!(form.to_query_string_with_search("typing"), "search=typing");
    }

    #[test]
    fn test_round_trip_through_query_string() {
        let mut form = FilterForm::default();
        form.set_search("my video");
        form.set_sort(SortOrder::Oldest);
        form.toggle_tag("b");
        form.toggle_tag("a");

        let parsed = FilterForm::from_query_string(&form.to_query_string());
        assert_eq!(parsed.search(), "my video");
        assert_eq!(parsed.sort(), SortOrder::Oldest);
        assert_eq!(parsed.tags(), ["a", "b"]);
    }

    #[test]
    fn test_criteria_uses_committed_search() {
        let mut form = FilterForm::default();
        form.set_search("still typ");
        form.toggle_tag("Rust");

        let criteria = form.criteria("committed");
        assert_eq!(criteria.search_query, "committed");
        assert_eq!(criteria.tags, ["rust"]);
    }
}
