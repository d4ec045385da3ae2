//! Operation responses.

use serde::{Deserialize, Serialize};

use crate::strategy::TextEncoding;

/// Permission bits and modification time shared by most results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    /// Permissions in octal (e.g. "0644").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mode: String,
    /// Last modification time (RFC 3339, UTC).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub modified_at: String,
}

/// Kind of a directory entry, as seen without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Pipe,
    Socket,
    Device,
    Other,
}

impl EntryKind {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Dir => "dir",
            EntryKind::Symlink => "symlink",
            EntryKind::Pipe => "pipe",
            EntryKind::Socket => "socket",
            EntryKind::Device => "device",
            EntryKind::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveResult {
    /// Root-relative path ("" for the root itself).
    pub path: String,
    /// Absolute host path.
    pub absolute: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadResult {
    /// Path as requested.
    pub path: String,
    /// Total file size in bytes.
    pub size: u64,
    pub mime_type: String,
    /// SHA-256 of the whole file; empty above the hashing cap.
    pub sha256: String,
    pub encoding: TextEncoding,
    /// File content, possibly truncated.
    pub content: String,
    pub truncated: bool,
    #[serde(flatten)]
    pub meta: FileMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeekResult {
    pub path: String,
    /// Starting byte offset of the window.
    pub offset: u64,
    /// Total file size.
    pub size: u64,
    /// Whether the window reached the end of the file.
    pub eof: bool,
    pub encoding: TextEncoding,
    pub content: String,
    #[serde(flatten)]
    pub meta: FileMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteResult {
    pub path: String,
    /// Strategy used.
    pub action: String,
    /// Total bytes in the final file.
    pub bytes: u64,
    /// Whether the file was newly created.
    pub created: bool,
    pub mime_type: String,
    /// SHA-256 of the final content; empty above the hashing cap.
    pub sha256: String,
    #[serde(flatten)]
    pub meta: FileMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditResult {
    pub path: String,
    pub replacements: usize,
    /// Final file size.
    pub bytes: u64,
    pub sha256: String,
    #[serde(flatten)]
    pub meta: FileMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListEntry {
    /// Path relative to the root.
    pub path: String,
    /// Base name.
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    pub mode: String,
    pub modified_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListResult {
    pub entries: Vec<ListEntry>,
    /// Whether the entry cap stopped the listing early.
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchMatch {
    /// File path relative to the root.
    pub path: String,
    /// 1-based line number.
    pub line: usize,
    /// Matching line, truncated for display when very long.
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    pub files_scanned: u64,
    pub bytes_read: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Matches in no particular order across files.
    pub matches: Vec<SearchMatch>,
    /// Whether the result cap stopped the scan early.
    #[serde(default)]
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<SearchStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobResult {
    /// Matched root-relative paths in no particular order.
    pub matches: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MkdirResult {
    pub path: String,
    /// Whether any directory was newly created.
    pub created: bool,
    /// Root-relative path of every directory the request expanded to.
    pub paths: Vec<String>,
    #[serde(flatten)]
    pub meta: FileMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RmdirResult {
    pub path: String,
    pub removed: bool,
}
