//! Client error types.

use thiserror::Error;

/// Errors raised while building or delivering messages.
///
/// Transport failures are not errors: a send that reaches the transport
/// reports success as a `bool`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Message(#[from] panelwire_core::Error),

    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_errors_keep_their_text() {
        let err: ClientError = panelwire_core::Error::MissingProperty { field: "$token" }.into();
        assert_eq!(err.to_string(), "'$token' is required but was not set");
    }
}
