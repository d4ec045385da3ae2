//! Kernel error types.
//!
//! Every failure carries the operation name, the caller's requested path, a
//! discriminated [`ErrorKind`] and, when one exists, the underlying I/O cause.
//! [`ErrorKind::code`] is the stable mapping onto the wire-level
//! [`ErrorCode`].

use std::io;
use std::time::Duration;

use confine_types::{ErrorCode, ErrorResponse};
use thiserror::Error;

/// What went wrong, independent of where.
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("path is required")]
    PathRequired,

    #[error("invalid file URI: {0}")]
    InvalidUri(String),

    /// The path resolves outside the root.
    #[error("refusing to access outside root")]
    PathEscape,

    /// The final component is a symlink whose target lies outside the root.
    #[error("refusing to follow symlink outside root")]
    SymlinkEscape,

    #[error("not found")]
    NotFound,

    /// Mutation target is a symlink.
    #[error("refusing to operate on symlink")]
    IsSymlink,

    #[error("is a directory")]
    IsDirectory,

    #[error("not a directory")]
    NotDirectory,

    #[error("not a regular file")]
    NotRegularFile,

    #[error("already exists")]
    AlreadyExists,

    #[error("invalid range [{start},{end}) for {len} bytes")]
    InvalidRange { start: i64, end: i64, len: u64 },

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("lock acquisition timed out after {0:?}")]
    LockTimeout(Duration),

    #[error("size {size} exceeds limit {limit}")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("operation cancelled")]
    Cancelled,

    /// Unclassified I/O failure; the cause holds the details.
    #[error("I/O error")]
    Io,
}

impl ErrorKind {
    /// Stable machine-readable code for this kind.
    pub fn code(&self) -> ErrorCode {
        match self {
            ErrorKind::PathRequired => ErrorCode::PathRequired,
            ErrorKind::InvalidUri(_) => ErrorCode::InvalidUri,
            ErrorKind::PathEscape | ErrorKind::SymlinkEscape => ErrorCode::PathEscape,
            ErrorKind::NotFound => ErrorCode::NotFound,
            ErrorKind::IsSymlink => ErrorCode::IsSymlink,
            ErrorKind::IsDirectory => ErrorCode::IsDirectory,
            ErrorKind::NotDirectory => ErrorCode::NotDirectory,
            ErrorKind::NotRegularFile => ErrorCode::NotRegularFile,
            ErrorKind::AlreadyExists => ErrorCode::AlreadyExists,
            ErrorKind::InvalidRange { .. } => ErrorCode::InvalidRange,
            ErrorKind::InvalidPattern(_) => ErrorCode::InvalidPattern,
            ErrorKind::InvalidArgument(_) => ErrorCode::InvalidArgument,
            ErrorKind::LockTimeout(_) => ErrorCode::LockTimeout,
            ErrorKind::FileTooLarge { .. } => ErrorCode::FileTooLarge,
            ErrorKind::Cancelled => ErrorCode::Cancelled,
            ErrorKind::Io => ErrorCode::Unknown,
        }
    }

    /// Classify an I/O error.
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
            io::ErrorKind::IsADirectory => ErrorKind::IsDirectory,
            io::ErrorKind::NotADirectory => ErrorKind::NotDirectory,
            io::ErrorKind::DirectoryNotEmpty => {
                ErrorKind::InvalidArgument("directory not empty".into())
            }
            _ => ErrorKind::Io,
        }
    }
}

/// Kernel error.
#[derive(Debug, Error)]
#[error("{op} {path}: {kind}{}", cause_suffix(.cause))]
pub struct FsError {
    /// Operation that failed (e.g. "write", "lock").
    pub op: &'static str,
    /// Path as the caller requested it.
    pub path: String,
    pub kind: ErrorKind,
    #[source]
    pub cause: Option<io::Error>,
}

fn cause_suffix(cause: &Option<io::Error>) -> String {
    match cause {
        Some(e) => format!(" ({e})"),
        None => String::new(),
    }
}

impl FsError {
    pub fn new(op: &'static str, path: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            op,
            path: path.into(),
            kind,
            cause: None,
        }
    }

    /// Wrap an I/O error, classifying its kind and keeping it as the cause.
    pub fn io(op: &'static str, path: impl Into<String>, err: io::Error) -> Self {
        Self {
            op,
            path: path.into(),
            kind: ErrorKind::from_io(&err),
            cause: Some(err),
        }
    }

    /// Closure form of [`FsError::io`] for `map_err`.
    pub fn io_with<'a>(op: &'static str, path: &'a str) -> impl (FnOnce(io::Error) -> FsError) + 'a {
        move |err| FsError::io(op, path, err)
    }

    /// Re-label the error with the operation the caller invoked.
    pub fn in_op(mut self, op: &'static str) -> Self {
        self.op = op;
        self
    }

    /// Re-label the error with the path the caller asked for.
    pub fn for_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.kind.code()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, ErrorKind::NotFound)
    }

    /// Agent-facing payload for this error.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: match &self.cause {
                Some(cause) => format!("{}: {}", self.kind, cause),
                None => self.kind.to_string(),
            },
            code: self.code(),
            operation: Some(self.op.to_string()),
            path: (!self.path.is_empty()).then(|| self.path.clone()),
        }
    }
}

/// Kernel result type.
pub type FsResult<T> = Result<T, FsError>;
