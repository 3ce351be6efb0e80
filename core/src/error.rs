//! Error types for request building and output parsing.

use thiserror::Error;

/// Errors raised while turning requests into argv or tool output into
/// records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// A required argument is missing, blank, or has an unusable value.
    #[error("invalid argument for '{operation}': {reason}")]
    InvalidArgument {
        operation: &'static str,
        reason: String,
    },

    /// The operation tag is not one the tool supports.
    #[error("unsupported SqlLocalDB operation: {0}")]
    UnsupportedOperation(String),

    /// `info <name>` printed a key outside the known field set.
    #[error("unrecognized field in instance info output: {0}")]
    UnrecognizedField(String),

    /// `info <name>` output lacked a field every instance has.
    #[error("instance info output is missing field: {0}")]
    MissingField(&'static str),
}

impl CommandError {
    pub(crate) fn invalid(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            operation,
            reason: reason.into(),
        }
    }
}

/// Convenience alias for results with [`CommandError`].
pub type Result<T> = std::result::Result<T, CommandError>;
