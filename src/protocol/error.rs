//! Ringwire error types

use std::fmt;
use std::io;

use thiserror::Error;

/// Closed set of outcome kinds shared by the engine and the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    /// The operation completed.
    Ok,
    /// A buffer or the arena was too small; the byte count carries the required size.
    NotEnoughSpace,
    /// Malformed or policy-rejected payload.
    InvalidData,
    /// An internal invariant was violated.
    InvalidState,
    /// Sender provisionally admitted, pending handshake.
    Candidate,
    /// Sender rejected by the admission layer.
    Filtered,
    /// Opaque failure from the operating system or caller misuse.
    SystemError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "OK",
            Self::NotEnoughSpace => "NOT_ENOUGH_SPACE",
            Self::InvalidData => "INVALID_DATA",
            Self::InvalidState => "INVALID_STATE",
            Self::Candidate => "CANDIDATE",
            Self::Filtered => "FILTERED",
            Self::SystemError => "SYSTEM_ERROR",
        };
        write!(f, "{name}")
    }
}

/// Ringwire errors
#[derive(Error, Debug)]
pub enum NetError {
    /// Buffer or arena too small
    #[error("not enough space: need {required} bytes")]
    NotEnoughSpace {
        /// Bytes the caller must make available before retrying
        required: usize,
    },

    /// Malformed or rejected payload
    #[error("invalid data: {reason}")]
    InvalidData {
        /// What was wrong with the data
        reason: &'static str,
    },

    /// Internal invariant violated
    #[error("invalid state: {what}")]
    InvalidState {
        /// Which invariant broke
        what: &'static str,
    },

    /// Sender rejected by the connection table or candidate gate
    #[error("filtered: sender not admitted")]
    Filtered,

    /// Operation the caller must never request on this endpoint
    #[error("misuse: {reason}")]
    Misuse {
        /// What the caller did wrong
        reason: &'static str,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl NetError {
    /// Shorthand for [`NetError::InvalidData`].
    #[must_use]
    pub const fn invalid_data(reason: &'static str) -> Self {
        Self::InvalidData { reason }
    }

    /// Map onto the closed outcome set.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotEnoughSpace { .. } => ErrorKind::NotEnoughSpace,
            Self::InvalidData { .. } => ErrorKind::InvalidData,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::Filtered => ErrorKind::Filtered,
            Self::Misuse { .. } | Self::Io(_) => ErrorKind::SystemError,
        }
    }

    /// Byte count carried alongside the error (the required size for
    /// [`ErrorKind::NotEnoughSpace`], zero otherwise).
    #[must_use]
    pub fn byte_count(&self) -> usize {
        match self {
            Self::NotEnoughSpace { required } => *required,
            _ => 0,
        }
    }

    /// Whether retrying the same call later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NotEnoughSpace { .. } => true,
            Self::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, NetError>;
