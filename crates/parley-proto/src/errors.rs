//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while decoding frames or normalizing wire records.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame contained nothing but end-of-line noise (broker heartbeat).
    #[error("empty frame")]
    EmptyFrame,

    /// Command line did not match any known command.
    #[error("unknown command: {command}")]
    UnknownCommand {
        /// The unrecognized command line.
        command: String,
    },

    /// Header line without a `name:value` separator.
    #[error("malformed header line: {line}")]
    MalformedHeader {
        /// The offending line.
        line: String,
    },

    /// Unknown escape sequence in a header name or value.
    #[error("bad header escape: \\{found}")]
    BadEscape {
        /// Character following the backslash.
        found: char,
    },

    /// Escape sequence cut off at the end of a header.
    #[error("truncated header escape")]
    TruncatedEscape,

    /// A record is missing a field required for normalization.
    #[error("missing required field: {field}")]
    MissingField {
        /// Name of the absent field.
        field: &'static str,
    },

    /// Body is not valid JSON, or not the JSON shape the record requires.
    #[error("invalid body: {reason}")]
    InvalidBody {
        /// Parser description of the failure.
        reason: String,
    },
}
