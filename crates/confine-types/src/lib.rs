//! Shared request, response and error-code types for confine.
//!
//! This crate is the wire-facing vocabulary of the file-access engine. It has
//! **no internal confine dependencies**: a pure leaf crate that the kernel and
//! any adapter layer build on.
//!
//! # Key Types
//!
//! |--------------------|---------------------------------------------------|
//! | Type               | Purpose                                           |
//! |--------------------|---------------------------------------------------|
//! | [`WriteStrategy`]  | How a write combines payload and existing bytes   |
//! | [`ResolveMode`]    | Parent-resolved vs fully-resolved containment     |
//! | [`TextEncoding`]   | Content encoding on the wire (text / base64)      |
//! | [`ErrorCode`]      | Stable machine-readable error code                |
//! | [`ErrorResponse`]  | Agent-facing error payload                        |
//! | `*Args`            | Operation requests                                |
//! | `*Result`          | Operation responses                               |
//! |--------------------|---------------------------------------------------|
//!
//! All paths carried by these types are relative to the root and use
//! forward-slash separators regardless of host OS.

pub mod args;
pub mod error;
pub mod results;
pub mod strategy;

pub use args::{
    EditArgs, GlobArgs, ListArgs, MkdirArgs, PeekArgs, ReadArgs, ResolveArgs, RmdirArgs,
    SearchArgs, WriteArgs,
};
pub use error::{ErrorCode, ErrorResponse};
pub use results::{
    EditResult, EntryKind, FileMeta, GlobResult, ListEntry, ListResult, MkdirResult, PeekResult,
    ReadResult, ResolveResult, RmdirResult, SearchMatch, SearchResult, SearchStats, WriteResult,
};
pub use strategy::{ResolveMode, StrategyError, StrategyKind, TextEncoding, WriteStrategy};
