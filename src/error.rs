// Failure taxonomy and terminal outcomes of one handled connection
use std::io;

use thiserror::Error;

use crate::reader::ReadFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("missing space in request line")]
    MissingSpace,
    #[error("unsupported request method")]
    UnsupportedMethod,
    #[error("header line without colon")]
    MalformedHeader,
    #[error("url or origin is not valid utf-8")]
    InvalidEncoding,
    #[error("content length out of range")]
    InvalidContentLength,
}

#[derive(Debug, Error)]
pub enum HandleError {
    #[error("client disconnected before request completed")]
    ClientDisconnected,
    #[error("request (receive) buffer congested")]
    BufferCongested,
    #[error("timeout")]
    Timeout,
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("i/o error while responding: {0}")]
    Io(#[from] io::Error),
}

impl HandleError {
    /// Stable reason string reported to diagnostics.
    pub fn reason(&self) -> &'static str {
        match self {
            HandleError::ClientDisconnected => "client_disconnected",
            HandleError::BufferCongested => "buffer_congested",
            HandleError::Timeout => "timeout",
            HandleError::Protocol(_) => "protocol_error",
            HandleError::Io(_) => "io_error",
        }
    }

    /// Compact numeric code for trace output. Read failures map to 0, -1 and
    /// -2; parse failures are -10 (-20 for the method); responding is -40.
    pub fn code(&self) -> i32 {
        match self {
            HandleError::ClientDisconnected => 0,
            HandleError::BufferCongested => -1,
            HandleError::Timeout => -2,
            HandleError::Protocol(ProtocolError::UnsupportedMethod) => -20,
            HandleError::Protocol(_) => -10,
            HandleError::Io(_) => -40,
        }
    }

    /// Whether a `500` may still be sent to the client.
    pub fn allows_response(&self) -> bool {
        !matches!(self, HandleError::ClientDisconnected | HandleError::Io(_))
    }
}

impl From<ReadFailure> for HandleError {
    fn from(f: ReadFailure) -> Self {
        match f {
            ReadFailure::Disconnected => HandleError::ClientDisconnected,
            ReadFailure::Congested => HandleError::BufferCongested,
            ReadFailure::TimedOut => HandleError::Timeout,
        }
    }
}

/// How a connection ended when no hard failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The processor ran and a response was produced.
    Processed,
    /// An authenticated OPTIONS request answered with headers only.
    Preflight,
    /// Credentials were missing or wrong; a `401` challenge was sent
    /// (OPTIONS requests get the challenge header on a `200`).
    Unauthorized,
    /// The connection was invalid or not new and was not read.
    Ignored,
}

/// Rejected handler settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("buffer size too small: {actual} bytes (min {min})")]
    BufferTooSmall { min: usize, actual: usize },
    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
}
