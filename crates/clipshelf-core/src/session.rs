//! Filter session: keeps the editable form, the committed URL state,
//! and the derived query criteria consistent.
//!
//! A session owns a [`FilterForm`] plus a debounce channel for the
//! search field. Sort and tag changes commit immediately; search
//! edits are accepted into the form at once (no keystroke is lost)
//! but only reach the committed state after the quiet window. Each
//! committed state carries the canonical URL query string — intended
//! for a replace-style location update, not a history push — and the
//! normalized criteria whose cache key drives the list query.

use tokio::sync::mpsc;
use tracing::debug;

use crate::criteria::ListCriteria;
use crate::criteria::SortOrder;
use crate::debounce::{self, DebounceInput};
use crate::defaults::DEBOUNCE_WINDOW;
use crate::filters::FilterForm;

/// One committed filter state: what the URL should say and what the
/// store should be asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSnapshot {
    /// Canonical query string (no leading `?`), defaults omitted.
    pub url_query: String,
    /// Normalized criteria for the query executor / cache key.
    pub criteria: ListCriteria,
}

/// Live filter state for one browsing session.
pub struct FilterSession {
    form: FilterForm,
    committed_search: String,
    input: DebounceInput<String>,
    commits: mpsc::UnboundedReceiver<String>,
}

impl FilterSession {
    /// Start a session from the current URL's query string (read once
    /// at mount). The initial search text counts as already
    /// committed.
    pub fn start(initial_query: &str) -> Self {
        let form = FilterForm::from_query_string(initial_query);
        let committed_search = form.search().to_string();
        let (input, commits) = debounce::channel(DEBOUNCE_WINDOW);
        Self {
            form,
            committed_search,
            input,
            commits,
        }
    }

    pub fn form(&self) -> &FilterForm {
        &self.form
    }

    /// The search text last committed to the URL and the query; may
    /// lag the editable field while the user is typing.
    pub fn committed_search(&self) -> &str {
        &self.committed_search
    }

    /// Current committed state.
    pub fn snapshot(&self) -> FilterSnapshot {
        FilterSnapshot {
            url_query: self.form.to_query_string_with_search(&self.committed_search),
            criteria: self.form.criteria(&self.committed_search),
        }
    }

    /// Accept a search edit. The form updates immediately; the commit
    /// arrives via [`Self::settled`] after the quiet window.
    pub fn edit_search(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.form.set_search(text.clone());
        self.input.send(text);
    }

    /// Change the sort order. Discrete selection: commits immediately.
    pub fn set_sort(&mut self, sort: SortOrder) -> FilterSnapshot {
        self.form.set_sort(sort);
        self.snapshot()
    }

    /// Toggle a tag selection. Discrete selection: commits immediately.
    pub fn toggle_tag(&mut self, name: &str) -> FilterSnapshot {
        self.form.toggle_tag(name);
        self.snapshot()
    }

    /// Restore all three fields to their defaults as one state
    /// transition yielding one snapshot. Replacing the debounce
    /// channel discards any search edit still waiting out its quiet
    /// window, so a stale commit cannot land after the reset.
    pub fn reset(&mut self) -> FilterSnapshot {
        self.form.reset();
        self.committed_search.clear();
        let (input, commits) = debounce::channel(DEBOUNCE_WINDOW);
        self.input = input;
        self.commits = commits;
        debug!(
            subsystem = "filters",
            op = "reset",
            "Filter state reset to defaults"
        );
        self.snapshot()
    }

    /// Await the next debounced search commit. Returns the snapshot
    /// reflecting the settled text, or `None` if the session's
    /// debounce worker is gone.
    pub async fn settled(&mut self) -> Option<FilterSnapshot> {
        let text = self.commits.recv().await?;
        debug!(
            subsystem = "filters",
            op = "commit",
            query = %text,
            "Debounced search committed"
        );
        self.committed_search = text;
        Some(self.snapshot())
    }
}
