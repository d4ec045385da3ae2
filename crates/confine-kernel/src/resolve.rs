//! Path containment.
//!
//! [`Root`] is the single directory every operation is confined to. It is
//! canonicalized once at construction (e.g. macOS `/tmp` → `/private/tmp`)
//! and never changes afterwards.
//!
//! [`Root::resolve`] turns a caller-supplied path or `file://` URI into a
//! [`ResolvedPath`] that was provably inside the root at the moment of
//! resolution. Containment is checked component-wise (`Path::starts_with`),
//! so a sibling such as `/srv/root-evil` never matches `/srv/root`.
//!
//! The guarantee is point-in-time: a symlink may be swapped between
//! resolution and use. Mutations re-check with `symlink_metadata` right
//! before writing.

use std::io;
use std::ops::Deref;
use std::path::{Component, Path, PathBuf};

use confine_types::ResolveMode;
use percent_encoding::percent_decode_str;

use crate::error::{ErrorKind, FsError, FsResult};

const FILE_SCHEME: &str = "file://";

/// The confinement directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    path: PathBuf,
}

/// An absolute path validated to lie inside a [`Root`].
///
/// Only [`Root::resolve`] constructs these.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedPath(PathBuf);

impl ResolvedPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl Deref for ResolvedPath {
    type Target = Path;

    fn deref(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Root {
    /// Establish a root directory.
    ///
    /// Relative paths are taken against the current working directory.
    pub fn new(path: impl AsRef<Path>) -> FsResult<Self> {
        let raw = path.as_ref();
        let display = raw.display().to_string();
        let canonical = dunce::canonicalize(raw).map_err(FsError::io_with("root", &display))?;
        let meta = std::fs::metadata(&canonical).map_err(FsError::io_with("root", &display))?;
        if !meta.is_dir() {
            return Err(FsError::new("root", display, ErrorKind::NotDirectory));
        }
        Ok(Self { path: canonical })
    }

    /// The canonical root path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `path` is the root or a descendant of it.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.path)
    }

    /// Resolve a requested path (or `file://` URI) inside the root.
    pub fn resolve(&self, request: &str, mode: ResolveMode) -> FsResult<ResolvedPath> {
        if request.trim().is_empty() {
            return Err(FsError::new("resolve", request, ErrorKind::PathRequired));
        }

        let working = if request.starts_with(FILE_SCHEME) {
            decode_file_uri(request).map_err(|kind| FsError::new("resolve", request, kind))?
        } else {
            request.to_string()
        };

        let cleaned = normalize(Path::new(&working));
        let joined = if cleaned.is_absolute() {
            cleaned
        } else {
            normalize(&self.path.join(cleaned))
        };

        let parent_resolved =
            resolve_existing_prefix(&joined).map_err(FsError::io_with("resolve", request))?;
        if !self.contains(&parent_resolved) {
            return Err(FsError::new("resolve", request, ErrorKind::PathEscape));
        }

        if mode == ResolveMode::ParentResolved {
            return Ok(ResolvedPath(parent_resolved));
        }

        match dunce::canonicalize(&parent_resolved) {
            Ok(target) if self.contains(&target) => Ok(ResolvedPath(target)),
            Ok(_) => Err(FsError::new("resolve", request, ErrorKind::SymlinkEscape)),
            // Missing target (or dangling link): the caller's own open reports it.
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ResolvedPath(parent_resolved)),
            Err(e) => Err(FsError::io("resolve", request, e)),
        }
    }

    /// Root-relative, forward-slash form of a path inside the root.
    ///
    /// Returns an empty string for the root itself.
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.path).unwrap_or(path);
        rel.components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Extract and percent-decode the path of a `file://` URI.
fn decode_file_uri(uri: &str) -> Result<String, ErrorKind> {
    let rest = &uri[FILE_SCHEME.len()..];
    let rest = rest.split(['?', '#']).next().unwrap_or_default();

    let path = match rest.find('/') {
        Some(0) => rest,
        Some(idx) => {
            let host = &rest[..idx];
            if !host.eq_ignore_ascii_case("localhost") {
                return Err(ErrorKind::InvalidUri(format!("unsupported host {host:?}")));
            }
            &rest[idx..]
        }
        None => return Err(ErrorKind::InvalidUri(format!("missing path in {uri:?}"))),
    };

    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map_err(|e| ErrorKind::InvalidUri(e.to_string()))?;
    if decoded.contains('\0') {
        return Err(ErrorKind::InvalidUri("NUL byte in path".into()));
    }
    Ok(decoded.into_owned())
}

/// Lexically collapse `.`, `..` and redundant separators.
///
/// Leading `..` on a relative path is kept so the later join with the root
/// can pop above it (and be caught by the containment check).
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    let mut depth = 0usize;
    for comp in path.components() {
        match comp {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    out.pop();
                    depth -= 1;
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(part) => {
                out.push(part);
                depth += 1;
            }
        }
    }
    out
}

/// Canonicalize the deepest existing ancestor of `path` (excluding the final
/// component) and re-append the remainder lexically.
///
/// The final component is never followed here. Missing intermediate
/// directories fall back to the lexical join.
fn resolve_existing_prefix(path: &Path) -> io::Result<PathBuf> {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        // The filesystem root itself.
        return Ok(path.to_path_buf());
    };

    let mut tail: Vec<&std::ffi::OsStr> = vec![name];
    let mut cursor = parent;
    loop {
        match dunce::canonicalize(cursor) {
            Ok(mut resolved) => {
                for part in tail.iter().rev() {
                    resolved.push(part);
                }
                return Ok(resolved);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                match (cursor.parent(), cursor.file_name()) {
                    (Some(up), Some(part)) => {
                        tail.push(part);
                        cursor = up;
                    }
                    _ => return Ok(path.to_path_buf()),
                }
            }
            Err(e) => return Err(e),
        }
    }
}
