//! Protocol error types

use thiserror::Error;

/// Failure of a single control message
///
/// Mirrors the libusb error codes a control transfer can produce.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Transfer timed out
    #[error("control transfer timed out")]
    Timeout,
    /// Endpoint stalled
    #[error("control pipe stalled")]
    Pipe,
    /// Device was disconnected
    #[error("device disconnected")]
    NoDevice,
    /// Device or endpoint not found
    #[error("device not found")]
    NotFound,
    /// Device is busy
    #[error("device busy")]
    Busy,
    /// Buffer overflow
    #[error("buffer overflow")]
    Overflow,
    /// I/O error
    #[error("I/O error")]
    Io,
    /// Invalid parameter
    #[error("invalid parameter")]
    InvalidParam,
    /// Access denied (permissions)
    #[error("access denied")]
    Access,
    /// Device accepted fewer bytes than the command length
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },
    /// Other error with message
    #[error("{message}")]
    Other { message: String },
}

/// Errors parsing an attribute request line
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("empty request")]
    Empty,

    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    #[error("missing value for '{0}'")]
    MissingValue(String),

    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),

    #[error("unknown verb '{0}'")]
    UnknownVerb(String),

    #[error("malformed response '{0}'")]
    MalformedResponse(String),
}
