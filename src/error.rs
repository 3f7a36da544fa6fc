//! Error and result types shared across the stream subsystem.
//!
//! Modeled on the teacher's `io::{Result, Error, ErrorKind}` split (io2
//! hand-rolled these before `std::io` stabilized); this crate runs on
//! stable `std` so `Error` wraps `std::io::Error` for OS-level failures
//! instead of reinventing `sys::os::error_string`, and adds the signal
//! taxonomy spec.md §7 names for the Lisp-level conditions this subsystem
//! raises.

use std::fmt;
use std::io;

pub type Result<T> = std::result::Result<T, Error>;

/// Mirrors the `signal(kind, args)` conditions of spec.md §7.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Value is not a recognized stream shape, a mark used as a stream is
    /// non-resident, or a process is used as an input stream.
    InvalidStream,
    /// A parameter failed a declared type or value constraint.
    BadArg,
    /// `format` was called with too few arguments for its specifiers.
    MissingArg,
    /// `fopen`-equivalent failed.
    FileError,
    /// `read` found EOF before a complete token.
    EndOfStream,
    /// Wraps an OS-level I/O failure (file open/flush/etc).
    Io,
    /// `copy-stream` was cancelled by the cooperative interrupt flag.
    Interrupted,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    /// Second signal argument, e.g. the offending value's debug rendering
    /// or a bound file name, mirroring the C source's `list_2(..)` payloads.
    detail: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Error {
        Error { kind, message: message.into(), detail: None }
    }

    pub fn with_detail(kind: ErrorKind, message: impl Into<String>, detail: impl Into<String>) -> Error {
        Error { kind, message: message.into(), detail: Some(detail.into()) }
    }

    pub fn invalid_stream(message: impl Into<String>) -> Error {
        Error::new(ErrorKind::InvalidStream, message)
    }

    pub fn bad_arg(message: impl Into<String>) -> Error {
        Error::new(ErrorKind::BadArg, message)
    }

    pub fn missing_arg(position: usize) -> Error {
        Error::new(ErrorKind::MissingArg, format!("missing argument at position {position}"))
    }

    pub fn file_error(errno_message: impl Into<String>, name: impl Into<String>) -> Error {
        Error::with_detail(ErrorKind::FileError, errno_message, name)
    }

    pub fn end_of_stream() -> Error {
        Error::new(ErrorKind::EndOfStream, "end of stream")
    }

    pub fn interrupted() -> Error {
        Error::new(ErrorKind::Interrupted, "copy-stream interrupted")
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{:?}: {} ({detail})", self.kind, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::new(ErrorKind::Io, e.to_string())
    }
}
