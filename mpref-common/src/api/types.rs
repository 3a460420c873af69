//! Response envelope types
//!
//! Every endpoint except `/health` answers with `{data, error}`; preference
//! replace responses add `warnings`.

use serde::{Deserialize, Serialize};

/// Uniform response wrapper
///
/// # Examples
///
/// ```
/// use mpref_common::api::Envelope;
///
/// let body = serde_json::to_value(Envelope::ok(42)).unwrap();
/// assert_eq!(body, serde_json::json!({"data": 42, "error": null}));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<PreferenceWarnings>,
}

impl<T> Envelope<T> {
    /// Successful response carrying `data`
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            warnings: None,
        }
    }

    /// Successful response carrying `data` and validation warnings
    pub fn with_warnings(data: T, warnings: PreferenceWarnings) -> Self {
        Self {
            data: Some(data),
            error: None,
            warnings: Some(warnings),
        }
    }
}

impl Envelope<()> {
    /// Failed response: `data` is null, `error` holds a user-visible message
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(message.into()),
            warnings: None,
        }
    }
}

/// Catalog ids that did not resolve during a preference replace
///
/// Both lists keep the order in which the ids appeared in the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceWarnings {
    pub invalid_track_ids: Vec<String>,
    pub invalid_artist_ids: Vec<String>,
}

impl PreferenceWarnings {
    /// True when every submitted id resolved
    pub fn is_empty(&self) -> bool {
        self.invalid_track_ids.is_empty() && self.invalid_artist_ids.is_empty()
    }
}
