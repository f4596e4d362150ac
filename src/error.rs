//! Error handling for fmtuner.
//!
//! Errors are categorized by gRPC status codes, with conversions from the
//! underlying transport, decoding and audio errors into the closest category.
//!
//! The playback engine never escalates these errors: every component that
//! talks to the station service or the audio output handles its own failures
//! by logging them and leaving state untouched. The categories exist so that
//! the log and the status line can tell a network outage apart from a server
//! that rejected a request.
//!
//! # Example
//!
//! ```rust
//! use fmtuner::error::{Error, ErrorKind, Result};
//!
//! fn check(index: usize, len: usize) -> Result<()> {
//!     if index == 0 || index > len {
//!         return Err(Error::out_of_range(format!("no channel {index}")));
//!     }
//!     Ok(())
//! }
//! ```

#![allow(clippy::enum_glob_use)]

use std::fmt;
use thiserror::Error;

/// Main error type combining error kind and details.
#[derive(Debug)]
pub struct Error {
    /// Classification of the error
    pub kind: ErrorKind,

    /// Details of the underlying error
    pub error: Box<dyn std::error::Error + Send + Sync>,
}

impl Error {
    /// Attempts to downcast the underlying error to a concrete type.
    #[must_use]
    pub fn downcast<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.error.downcast_ref::<E>()
    }
}

/// Standard result type for fmtuner operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories based on gRPC status codes.
///
/// See [gRPC status codes](https://github.com/googleapis/googleapis/blob/master/google/rpc/code.proto)
/// for the original definitions.
#[expect(clippy::module_name_repetitions)]
#[derive(Clone, Copy, Debug, Eq, Error, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u32)]
pub enum ErrorKind {
    /// HTTP Mapping: 499 Client Closed Request
    #[error("operation was cancelled")]
    Cancelled = 1,

    /// HTTP Mapping: 500 Internal Server Error
    #[error("unknown error")]
    Unknown = 2,

    /// HTTP Mapping: 400 Bad Request
    #[error("invalid argument specified")]
    InvalidArgument = 3,

    /// HTTP Mapping: 504 Gateway Timeout
    #[error("operation timed out")]
    DeadlineExceeded = 4,

    /// HTTP Mapping: 404 Not Found
    #[error("not found")]
    NotFound = 5,

    /// HTTP Mapping: 409 Conflict
    #[error("attempt to create what already exists")]
    AlreadyExists = 6,

    /// HTTP Mapping: 403 Forbidden
    #[error("permission denied")]
    PermissionDenied = 7,

    /// HTTP Mapping: 401 Unauthorized
    #[error("no valid authentication credentials")]
    Unauthenticated = 16,

    /// HTTP Mapping: 429 Too Many Requests
    #[error("resource has been exhausted")]
    ResourceExhausted = 8,

    /// HTTP Mapping: 400 Bad Request
    #[error("invalid state")]
    FailedPrecondition = 9,

    /// HTTP Mapping: 409 Conflict
    #[error("operation aborted")]
    Aborted = 10,

    /// HTTP Mapping: 400 Bad Request
    #[error("out of range")]
    OutOfRange = 11,

    /// HTTP Mapping: 501 Not Implemented
    #[error("not implemented")]
    Unimplemented = 12,

    /// HTTP Mapping: 500 Internal Server Error
    #[error("internal error")]
    Internal = 13,

    /// HTTP Mapping: 503 Service Unavailable
    #[error("service unavailable")]
    Unavailable = 14,

    /// HTTP Mapping: 500 Internal Server Error
    #[error("unrecoverable data loss or corruption")]
    DataLoss = 15,
}

/// Generates one constructor per error kind.
macro_rules! constructors {
    ($($(#[$doc:meta])* $name:ident => $kind:ident),* $(,)?) => {
        impl Error {
            $(
                $(#[$doc])*
                pub fn $name<E>(error: E) -> Self
                where
                    E: Into<Box<dyn std::error::Error + Send + Sync>>,
                {
                    Self::new(ErrorKind::$kind, error)
                }
            )*
        }
    };
}

impl Error {
    /// Creates a new error with specified kind and details.
    ///
    /// # Examples
    ///
    /// ```rust
    /// let err = Error::new(ErrorKind::NotFound, "channel not found");
    /// assert_eq!(err.kind, ErrorKind::NotFound);
    /// ```
    pub fn new<E>(kind: ErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind,
            error: error.into(),
        }
    }
}

constructors! {
    /// Operation interrupted mid-execution, like a dropped connection.
    aborted => Aborted,
    /// Attempt to create what already exists, like logging in twice.
    already_exists => AlreadyExists,
    /// Operation cancelled before completion.
    cancelled => Cancelled,
    /// Data corrupted or truncated beyond recovery.
    data_loss => DataLoss,
    /// Network operation or other time-bound operation timed out.
    deadline_exceeded => DeadlineExceeded,
    /// Operation cannot proceed in the current state.
    failed_precondition => FailedPrecondition,
    /// Unexpected internal error.
    internal => Internal,
    /// Arguments or decoded data do not meet expectations.
    invalid_argument => InvalidArgument,
    /// Requested resource does not exist.
    not_found => NotFound,
    /// Value exceeds its allowed bounds.
    out_of_range => OutOfRange,
    /// Caller lacks the necessary permissions.
    permission_denied => PermissionDenied,
    /// Resource limit reached.
    resource_exhausted => ResourceExhausted,
    /// Credentials are invalid, expired or missing.
    unauthenticated => Unauthenticated,
    /// Service is temporarily unavailable or reported a failure.
    unavailable => Unavailable,
    /// Requested operation is not implemented.
    unimplemented => Unimplemented,
    /// Error that does not fit any other category.
    unknown => Unknown,
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.source()
    }
}

/// Formats the error as "{kind}: {details}".
impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}: ", self.kind)?;
        self.error.fmt(fmt)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind::*;
        match err.kind() {
            NotFound => Self::not_found(err),
            PermissionDenied => Self::permission_denied(err),
            AddrInUse | AlreadyExists => Self::already_exists(err),
            AddrNotAvailable | ConnectionRefused | NotConnected => Self::unavailable(err),
            BrokenPipe | ConnectionReset | ConnectionAborted => Self::aborted(err),
            Interrupted | WouldBlock => Self::cancelled(err),
            UnexpectedEof => Self::data_loss(err),
            TimedOut => Self::deadline_exceeded(err),
            InvalidInput | InvalidData => Self::invalid_argument(err),
            WriteZero => Self::resource_exhausted(err),
            _ => Self::unknown(err),
        }
    }
}

/// Maps HTTP client errors by their nature. A transport failure (connect,
/// timeout) is kept apart from a server that answered with an error status.
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::deadline_exceeded(err);
        }

        if err.is_connect() {
            return Self::unavailable(err);
        }

        if err.is_body() {
            return Self::data_loss(err);
        }

        if err.is_decode() {
            return Self::invalid_argument(err);
        }

        if err.is_builder() {
            return Self::internal(err);
        }

        if err.is_redirect() {
            return Self::resource_exhausted(err);
        }

        if err.is_status() {
            return Self::unavailable(err);
        }

        Self::unknown(err)
    }
}

/// Converts JSON errors through IO error mapping.
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        std::io::Error::from(err).into()
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::invalid_argument(e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::invalid_argument(e.to_string())
    }
}

impl<T> From<std::sync::mpsc::SendError<T>> for Error {
    fn from(e: std::sync::mpsc::SendError<T>) -> Self {
        Self::unavailable(e.to_string())
    }
}

impl<S> From<stream_download::StreamInitializationError<S>> for Error
where
    S: stream_download::source::SourceStream,
{
    fn from(e: stream_download::StreamInitializationError<S>) -> Self {
        Self::internal(e.to_string())
    }
}

/// Maps stream errors:
/// * `FetchFailure` -> `DataLoss`
/// * `ResponseFailure` -> `Unavailable`
impl<C> From<stream_download::http::HttpStreamError<C>> for Error
where
    C: stream_download::http::Client,
{
    fn from(e: stream_download::http::HttpStreamError<C>) -> Self {
        use stream_download::http::HttpStreamError::*;
        match e {
            FetchFailure(e) => Self::data_loss(e.to_string()),
            ResponseFailure(e) => Self::unavailable(e.to_string()),
        }
    }
}

impl From<rodio::StreamError> for Error {
    fn from(e: rodio::StreamError) -> Self {
        use rodio::StreamError::*;
        match e {
            PlayStreamError(e) => Self::unavailable(e),
            DefaultStreamConfigError(e) => Self::unavailable(e),
            BuildStreamError(e) => Self::unavailable(e),
            SupportedStreamConfigsError(e) => Self::not_found(e),
            NoDevice => Self::not_found(e),
        }
    }
}

impl From<rodio::PlayError> for Error {
    fn from(e: rodio::PlayError) -> Self {
        use rodio::PlayError::*;
        match e {
            DecoderError(e) => Self::data_loss(e),
            NoDevice => Self::not_found(e),
        }
    }
}

impl From<rodio::decoder::DecoderError> for Error {
    fn from(e: rodio::decoder::DecoderError) -> Self {
        Self::data_loss(e)
    }
}
