//! Format errors raised while decoding map and security files.
//!
//! A format error is always recoverable: the caller reports it and keeps
//! whatever document it had before.

use thiserror::Error;

/// Malformed or incomplete input document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    /// The input text is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(String),

    /// The top-level value is not an object.
    #[error("document root must be a JSON object")]
    NotAnObject,

    /// A required top-level field is absent.
    #[error("invalid file format: missing required field `{0}`")]
    MissingField(&'static str),

    /// A top-level field is present but has the wrong shape.
    #[error("field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// A node tuple or record cannot be decoded.
    #[error("node #{index} is malformed: {reason}")]
    MalformedNode { index: usize, reason: String },

    /// An edge tuple or record cannot be decoded.
    #[error("edge #{index} is malformed: {reason}")]
    MalformedEdge { index: usize, reason: String },
}

impl FormatError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        FormatError::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// Whether the error concerns a single element rather than the document shape.
    pub fn is_element_error(&self) -> bool {
        matches!(
            self,
            FormatError::MalformedNode { .. } | FormatError::MalformedEdge { .. }
        )
    }
}

impl From<serde_json::Error> for FormatError {
    fn from(err: serde_json::Error) -> Self {
        FormatError::Json(err.to_string())
    }
}
