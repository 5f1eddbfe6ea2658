//! # clipshelf-core
//!
//! Core types, traits, and abstractions for the clipshelf video
//! catalog.
//!
//! This crate provides the criteria schema and normalizer, the
//! filter-form state with its URL codec, the debouncer for continuous
//! text input, and the repository trait definitions the other
//! clipshelf crates depend on.

pub mod criteria;
pub mod debounce;
pub mod defaults;
pub mod error;
pub mod filters;
pub mod logging;
pub mod models;
pub mod session;
pub mod traits;
pub mod validate;

// Re-export commonly used types at crate root
pub use criteria::{normalize_search, normalize_tag, ListCriteria, SortOrder, CACHE_NAMESPACE};
pub use error::{Error, FieldError, Result, ValidationErrors};
pub use filters::{FilterForm, PARAM_SEARCH, PARAM_SORT, PARAM_TAGS};
pub use models::{CreateVideoRequest, ListVideosResponse, Tag, Video};
pub use session::{FilterSession, FilterSnapshot};
pub use traits::{TagRepository, VideoRepository};
pub use validate::{NumericInput, RawVideoInput};
