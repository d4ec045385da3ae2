//! # confine-kernel
//!
//! File access confined to a single root directory.
//!
//! A [`ConfinedFs`] owns one [`Root`] and serves every operation through it:
//! - Paths (plain or `file://`) are resolved and must stay under the root,
//!   including after symlink resolution
//! - Mutations take an advisory sentinel lock and land atomically
//!   (stage in the same directory, then rename)
//! - Search and glob fan out over a bounded worker pool and stop early once
//!   the result cap is reached
//! - Content is classified as text or binary for encoding and MIME type
//!
//! Each operation is also exposed as an [`ExecutionEngine`] so a
//! [`ToolRegistry`] can drive it with JSON parameters.

pub mod brace;
pub mod classify;
pub mod config;
pub mod error;
pub mod file_tools;
pub mod fs;
pub mod lock;
pub mod mutate;
pub mod resolve;
pub mod scan;
pub mod tools;

pub use config::{ConfigError, FsConfig};
pub use error::{ErrorKind, FsError, FsResult};
pub use file_tools::{
    EditEngine, GlobEngine, Interrupter, ListEngine, MkdirEngine, PeekEngine, ReadEngine,
    ResolveEngine, RmdirEngine, SearchEngine, WriteEngine, register_file_tools,
};
pub use fs::ConfinedFs;
pub use lock::{LockHandle, PathLocker, SentinelLocker};
pub use resolve::{ResolvedPath, Root};
pub use scan::{LineMatcher, ScanEngine, ScanLimits};
pub use tools::{ExecResult, ExecutionEngine, ToolInfo, ToolRegistry};

pub use confine_types as types;
