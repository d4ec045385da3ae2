//! Stable error codes and the agent-facing error payload.

use serde::{Deserialize, Serialize};

/// Machine-readable error code.
///
/// Codes are part of the external contract: adapters match on them, so a
/// code is never renamed once published.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    PathRequired,
    InvalidUri,
    PathEscape,
    NotFound,
    IsSymlink,
    IsDirectory,
    NotDirectory,
    NotRegularFile,
    AlreadyExists,
    InvalidRange,
    InvalidPattern,
    InvalidArgument,
    LockTimeout,
    FileTooLarge,
    Cancelled,
    #[serde(rename = "UNKNOWN_ERROR")]
    Unknown,
}

impl ErrorCode {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::PathRequired => "PATH_REQUIRED",
            ErrorCode::InvalidUri => "INVALID_URI",
            ErrorCode::PathEscape => "PATH_ESCAPE",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::IsSymlink => "IS_SYMLINK",
            ErrorCode::IsDirectory => "IS_DIRECTORY",
            ErrorCode::NotDirectory => "NOT_DIRECTORY",
            ErrorCode::NotRegularFile => "NOT_REGULAR_FILE",
            ErrorCode::AlreadyExists => "ALREADY_EXISTS",
            ErrorCode::InvalidRange => "INVALID_RANGE",
            ErrorCode::InvalidPattern => "INVALID_PATTERN",
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::LockTimeout => "LOCK_TIMEOUT",
            ErrorCode::FileTooLarge => "FILE_TOO_LARGE",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::Unknown => "UNKNOWN_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error payload returned to the caller of a failed operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
    /// Stable machine-readable code.
    pub code: ErrorCode,
    /// Operation that failed (e.g. "write").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Requested path, as the caller supplied it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}
