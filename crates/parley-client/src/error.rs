//! Error types for the connection state machine.
//!
//! Strongly-typed errors for state transitions and frame dispatch. Transport
//! and REST failures carry their own types next to the code that produces
//! them; this module only covers the pure machine.

use thiserror::Error;

use crate::connection::ConnectionStatus;

use parley_proto::Command;

/// Errors that can occur during connection state machine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Invalid state transition attempted
    #[error("invalid state: cannot {operation} while {status:?}")]
    InvalidState {
        /// Current status when the error occurred
        status: ConnectionStatus,
        /// Operation that was attempted
        operation: String,
    },

    /// Received a frame whose command is not valid for the current status
    #[error("unexpected {command:?} frame in status {status:?}")]
    UnexpectedFrame {
        /// Current status when the frame arrived
        status: ConnectionStatus,
        /// Command of the unexpected frame
        command: Command,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_operation() {
        let err = ClientError::InvalidState {
            status: ConnectionStatus::Idle,
            operation: "publish".to_string(),
        };
        assert_eq!(err.to_string(), "invalid state: cannot publish while Idle");
    }

    #[test]
    fn display_names_the_command() {
        let err = ClientError::UnexpectedFrame {
            status: ConnectionStatus::Connecting,
            command: Command::Message,
        };
        assert!(err.to_string().contains("Message"));
        assert!(err.to_string().contains("Connecting"));
    }
}
