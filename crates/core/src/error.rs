//! Error types for message construction.
//!
//! Uses `thiserror` for ergonomic error definitions. Parser rejections are a
//! separate, non-fatal error type: a rejected user property is dropped, while
//! a rejected required property fails the whole message.

use thiserror::Error;

/// The top-level error type for building and encoding messages.
#[derive(Debug, Error)]
pub enum Error {
    // --- Required field errors ---
    #[error("'{field}' is required but was not set")]
    MissingProperty { field: &'static str },

    #[error("'{field}' is invalid: {reason}")]
    InvalidProperty { field: &'static str, reason: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cannot encode message of kind {0}")]
    Unencodable(String),
}

impl Error {
    /// Wrap a parser rejection of a required field.
    pub fn invalid(field: &'static str, err: ParseError) -> Self {
        Self::InvalidProperty {
            field,
            reason: err.to_string(),
        }
    }

    /// The name of the required field this error refers to, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingProperty { field } | Self::InvalidProperty { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// A value rejected by one of the value parsers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("value is null")]
    Null,

    #[error("expected {expected}, got {found}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("value is empty")]
    Empty,

    #[error("'{value}' is not a valid {expected}")]
    Malformed {
        expected: &'static str,
        value: String,
    },

    #[error("number is not finite")]
    NonFinite,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_property_names_field() {
        let err = Error::MissingProperty { field: "token" };
        assert_eq!(err.to_string(), "'token' is required but was not set");
        assert_eq!(err.field(), Some("token"));
    }

    #[test]
    fn invalid_property_carries_parser_reason() {
        let err = Error::invalid(
            "distinct_id",
            ParseError::UnexpectedType {
                expected: "distinct id",
                found: "bool",
            },
        );
        assert!(err.to_string().contains("distinct_id"));
        assert!(err.to_string().contains("expected distinct id, got bool"));
    }

    #[test]
    fn unencodable_has_no_field() {
        assert_eq!(Error::Unencodable("batch".into()).field(), None);
    }
}
