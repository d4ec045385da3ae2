//! Operation requests.
//!
//! Size and count caps left unset (or zero) fall back to the configured
//! defaults of the kernel.

use serde::{Deserialize, Serialize};

use crate::strategy::{ResolveMode, StrategyKind, TextEncoding};

fn default_true() -> bool {
    true
}

/// Resolve a path without touching its content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolveArgs {
    /// File path or `file://` URI within the root.
    pub path: String,
    #[serde(default)]
    pub mode: ResolveMode,
}

/// Read the head of a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadArgs {
    /// File path or `file://` URI within the root.
    pub path: String,
    /// Force text or base64; chosen from the content when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<TextEncoding>,
    /// Maximum bytes to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<u64>,
}

/// Read a window of a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeekArgs {
    pub path: String,
    /// Byte offset of the window.
    #[serde(default)]
    pub offset: u64,
    /// Window size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<TextEncoding>,
}

/// Write a payload with one of the write strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteArgs {
    pub path: String,
    /// Encoding of `content`.
    pub encoding: TextEncoding,
    pub content: String,
    #[serde(default)]
    pub strategy: StrategyKind,
    /// Create missing parent directories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_dirs: Option<bool>,
    /// Octal permission bits, e.g. "0644". Existing bits are kept when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Start byte for `replace_range`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    /// End byte (exclusive) for `replace_range`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
}

impl WriteArgs {
    /// A text overwrite of `path` with `content`.
    pub fn text(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            encoding: TextEncoding::Text,
            content: content.into(),
            strategy: StrategyKind::Overwrite,
            create_dirs: None,
            mode: None,
            start: None,
            end: None,
        }
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_range(mut self, start: i64, end: i64) -> Self {
        self.strategy = StrategyKind::ReplaceRange;
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn with_create_dirs(mut self, create_dirs: bool) -> Self {
        self.create_dirs = Some(create_dirs);
        self
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }
}

/// Replace occurrences of a pattern inside a text file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditArgs {
    pub path: String,
    /// Substring, or regular expression when `regex` is set.
    pub pattern: String,
    /// Replacement text. With `regex`, `$1`/`${name}` expand capture groups.
    #[serde(default)]
    pub replace: String,
    #[serde(default)]
    pub regex: bool,
    /// Maximum replacements; 0 replaces every occurrence.
    #[serde(default)]
    pub count: usize,
}

/// List a directory (or describe a single file).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListArgs {
    /// Directory to list; the root when empty.
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,
}

/// Search file contents line by line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchArgs {
    pub pattern: String,
    /// Start directory; the root when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub regex: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
}

/// Match root-relative file paths against a glob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobArgs {
    /// Glob pattern; `**` spans directories.
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
}

/// Create one or more directories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MkdirArgs {
    /// Directory path; `{a,b}` expands to several paths.
    pub path: String,
    /// Octal permission bits; 0755 when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Create missing parents.
    #[serde(default = "default_true")]
    pub parents: bool,
    /// Expand `{a,b,c}` before resolving.
    #[serde(default = "default_true")]
    pub brace_expand: bool,
}

impl MkdirArgs {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: None,
            parents: true,
            brace_expand: true,
        }
    }
}

/// Remove a directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RmdirArgs {
    pub path: String,
    /// Remove contents as well.
    #[serde(default)]
    pub recursive: bool,
}
