//! Error types for mock engine operations.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::kind::ResourceKind;

/// Field-level validation messages, keyed by field name.
///
/// Mirrors the `details` block of a `RecordInvalid` API response. Fields are
/// kept sorted so error output is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    /// Create an empty error set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Returns true if no violation was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for a field, if any.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Iterate over `(field, messages)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for messages in self.0.values() {
            for message in messages {
                if !first {
                    f.write_str(", ")?;
                }
                f.write_str(message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Errors that can occur while emulating the ticketing API.
#[derive(Debug, Error)]
pub enum MockError {
    /// Configuration value is missing or malformed.
    #[error("invalid mock configuration: {0}")]
    ConfigInvalid(String),

    /// Record does not exist in the addressed collection.
    #[error("{kind} {id} not found")]
    NotFound { kind: ResourceKind, id: u64 },

    /// One or more field-level constraint violations.
    #[error("Validation failed: {0}")]
    ValidationFailed(ValidationErrors),

    /// The request itself is malformed (missing id, unknown kind, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A continuation token could not be parsed back into a request.
    #[error("invalid continuation token '{0}'")]
    InvalidToken(String),

    /// JSON conversion error.
    #[error("failed to convert JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("invalid URL: {0}")]
    UrlError(#[from] url::ParseError),
}

impl MockError {
    /// Build a single-field validation failure.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        Self::ValidationFailed(errors)
    }

    /// HTTP status code the real API would answer with.
    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::ValidationFailed(_) => 422,
            Self::ConfigInvalid(_) => 500,
            Self::InvalidRequest(_)
            | Self::InvalidToken(_)
            | Self::ParseError(_)
            | Self::UrlError(_) => 400,
        }
    }

    /// Error body in the shape the real API returns.
    pub fn to_body(&self) -> Value {
        match self {
            Self::NotFound { .. } => json!({
                "error": "RecordNotFound",
                "description": "Not found",
            }),
            Self::ValidationFailed(errors) => record_invalid_body(errors),
            other => json!({
                "error": "InvalidEndpoint",
                "description": other.to_string(),
            }),
        }
    }
}

/// `RecordInvalid` body with per-field `details`.
pub(crate) fn record_invalid_body(errors: &ValidationErrors) -> Value {
    let details: serde_json::Map<String, Value> = errors
        .iter()
        .map(|(field, messages)| {
            let entries = messages
                .iter()
                .map(|m| json!({ "description": m }))
                .collect::<Vec<_>>();
            (field.clone(), Value::Array(entries))
        })
        .collect();

    json!({
        "error": "RecordInvalid",
        "description": "Record validation errors",
        "details": details,
    })
}

/// Result type alias for mock engine operations.
pub type Result<T> = core::result::Result<T, MockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_contains_messages() {
        let mut errors = ValidationErrors::new();
        errors.add("external_id", "External has already been taken");
        let err = MockError::ValidationFailed(errors);

        assert_eq!(err.status(), 422);
        assert!(err.to_string().contains("External has already been taken"));
    }

    #[test]
    fn test_record_invalid_body_shape() {
        let err = MockError::invalid_field("email", "Email: a@b.c is already being used by another user");
        let body = err.to_body();

        assert_eq!(body["error"], "RecordInvalid");
        assert_eq!(
            body["details"]["email"][0]["description"],
            "Email: a@b.c is already being used by another user"
        );
    }

    #[test]
    fn test_not_found_status() {
        let err = MockError::NotFound {
            kind: ResourceKind::Users,
            id: 7,
        };
        assert_eq!(err.status(), 404);
        assert_eq!(err.to_string(), "user 7 not found");
        assert_eq!(err.to_body()["error"], "RecordNotFound");
    }
}
