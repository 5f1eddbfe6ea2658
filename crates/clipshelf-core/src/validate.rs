//! Create-input validation and numeric coercion.
//!
//! Raw wire input arrives with numbers that may be JSON numbers,
//! numeric strings, or empty strings (HTML form fields submit "" for
//! untouched inputs). Coercion runs first, as named pure functions,
//! then range checks; every offending field is collected before the
//! input is rejected, so one response reports the whole form.

use serde::Deserialize;
use url::Url;

use crate::error::{Result, ValidationErrors};
use crate::models::CreateVideoRequest;

/// A numeric wire value: a JSON number or a string to be coerced.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
}

/// Coerce an optional numeric input to an integer.
///
/// An empty (or whitespace-only) string counts as "not provided" and
/// yields `Ok(None)`, exactly like an absent field. Non-numeric text
/// and fractional values are errors.
pub fn coerce_optional_number(input: Option<&NumericInput>) -> std::result::Result<Option<i64>, String> {
    let raw = match input {
        None => return Ok(None),
        Some(NumericInput::Number(n)) => *n,
        Some(NumericInput::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .map_err(|_| format!("'{}' is not a number", trimmed))?
        }
    };

    if raw.fract() != 0.0 {
        return Err(format!("{} is not a whole number", raw));
    }
    Ok(Some(raw as i64))
}

/// Coerce a required numeric input to an integer.
///
/// Absent and empty-string inputs are "missing", which is an error
/// here since there is no default to fall back to.
pub fn coerce_required_number(input: Option<&NumericInput>) -> std::result::Result<i64, String> {
    coerce_optional_number(input)?.ok_or_else(|| "is required".to_string())
}

/// Check that a string parses as an absolute URL.
pub fn validate_absolute_url(raw: &str) -> std::result::Result<(), String> {
    // Url::parse only succeeds on absolute URLs; relative references
    // fail with RelativeUrlWithoutBase.
    Url::parse(raw).map(|_| ()).map_err(|e| e.to_string())
}

/// Raw create-video input as received from the wire.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct RawVideoInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub views: Option<NumericInput>,
    #[serde(default)]
    pub duration: Option<NumericInput>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl RawVideoInput {
    /// Validate and coerce into a [`CreateVideoRequest`].
    ///
    /// Collects every field failure; succeeds only when all fields
    /// pass. The title is checked as given (no trimming here — a
    /// caller that wants trimmed titles trims before submitting), and
    /// tags pass through raw: lowercasing and deduplication belong to
    /// the persistence boundary.
    pub fn validate(self) -> Result<CreateVideoRequest> {
        let mut errors = ValidationErrors::new();

        let title = self.title.unwrap_or_default();
        if title.is_empty() {
            errors.push("title", "Title of the video is required");
        }

        let thumbnail_url = self.thumbnail_url.unwrap_or_default();
        if let Err(reason) = validate_absolute_url(&thumbnail_url) {
            errors.push("thumbnail_url", format!("must be a valid URL: {}", reason));
        }

        let views = match coerce_optional_number(self.views.as_ref()) {
            Ok(v) => {
                let views = v.unwrap_or(0);
                if views < 0 {
                    errors.push("views", "must be at least 0");
                }
                views
            }
            Err(reason) => {
                errors.push("views", reason);
                0
            }
        };

        let duration_seconds = match coerce_required_number(self.duration.as_ref()) {
            Ok(d) => {
                if d < 1 {
                    errors.push(
                        "duration",
                        "Duration of the video is required to be at least 1 second",
                    );
                }
                d
            }
            Err(reason) => {
                errors.push("duration", reason);
                0
            }
        };

        let duration_seconds = i32::try_from(duration_seconds).unwrap_or_else(|_| {
            errors.push("duration", "is out of range");
            0
        });

        errors.into_result(CreateVideoRequest {
            title,
            thumbnail_url,
            duration_seconds,
            views,
            tags: self.tags.unwrap_or_default(),
        })
    }
}
