//! File tool engines backed by a [`ConfinedFs`].
//!
//! ```text
//! ┌──────────────┐   JSON params    ┌─────────────────┐
//! │ ToolRegistry │ ───────────────> │ fs_* engine     │
//! └──────────────┘                  │  (parse *Args)  │
//!        ^                          └────────┬────────┘
//!        │ ExecResult                        │
//!        │  stdout: *Result JSON             v
//!        │  stderr: ErrorResponse   ┌─────────────────┐
//!        └───────────────────────── │   ConfinedFs    │
//!                                   │ resolve · lock  │
//!                                   │ mutate · scan   │
//!                                   └─────────────────┘
//! ```
//!
//! Engines that can block (lock waits, scans) share an [`Interrupter`]; calling
//! [`ExecutionEngine::interrupt`] cancels whatever they are running.

pub mod dirs;
pub mod edit;
pub mod glob;
pub mod list;
pub mod read;
pub mod resolve;
pub mod search;
pub mod write;

pub use dirs::{MkdirEngine, RmdirEngine};
pub use edit::EditEngine;
pub use glob::GlobEngine;
pub use list::ListEngine;
pub use read::{PeekEngine, ReadEngine};
pub use resolve::ResolveEngine;
pub use search::SearchEngine;
pub use write::WriteEngine;

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::FsResult;
use crate::fs::ConfinedFs;
use crate::tools::{ExecResult, ExecutionEngine, ToolRegistry};

/// Category under which file engines are registered.
pub const FILE_CATEGORY: &str = "file";

/// Register every file engine on `registry`.
pub fn register_file_tools(registry: &mut ToolRegistry, fs: Arc<ConfinedFs>) {
    let engines: Vec<Arc<dyn ExecutionEngine>> = vec![
        Arc::new(ResolveEngine::new(fs.clone())),
        Arc::new(ReadEngine::new(fs.clone())),
        Arc::new(PeekEngine::new(fs.clone())),
        Arc::new(WriteEngine::new(fs.clone())),
        Arc::new(EditEngine::new(fs.clone())),
        Arc::new(ListEngine::new(fs.clone())),
        Arc::new(SearchEngine::new(fs.clone())),
        Arc::new(GlobEngine::new(fs.clone())),
        Arc::new(MkdirEngine::new(fs.clone())),
        Arc::new(RmdirEngine::new(fs)),
    ];
    for engine in engines {
        registry.register_engine(FILE_CATEGORY, engine);
    }
}

/// Turn an operation outcome into an [`ExecResult`].
pub(crate) fn reply<T: Serialize>(result: FsResult<T>) -> anyhow::Result<ExecResult> {
    match result {
        Ok(value) => ExecResult::json(&value),
        Err(e) => ExecResult::fs_error(&e),
    }
}

/// Hands out cancellation tokens and cancels them on interrupt.
///
/// Calls started after an interrupt get a fresh token.
#[derive(Debug, Default)]
pub struct Interrupter {
    current: Mutex<CancellationToken>,
}

impl Interrupter {
    pub fn token(&self) -> CancellationToken {
        self.current.lock().clone()
    }

    pub fn interrupt(&self) {
        let previous = std::mem::take(&mut *self.current.lock());
        previous.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FsConfig;
    use confine_types::{ErrorCode, ReadResult, WriteResult};
    use tempfile::TempDir;

    fn setup() -> (TempDir, ToolRegistry) {
        let dir = TempDir::new().unwrap();
        let fs = Arc::new(ConfinedFs::new(dir.path(), FsConfig::default()).unwrap());
        let mut registry = ToolRegistry::new();
        register_file_tools(&mut registry, fs);
        (dir, registry)
    }

    #[test]
    fn test_registers_all_engines() {
        let (_dir, registry) = setup();
        let names: Vec<_> = registry.list().iter().map(|t| t.name.clone()).collect();
        assert_eq!(
            names,
            vec![
                "fs_edit", "fs_glob", "fs_list", "fs_mkdir", "fs_peek", "fs_read", "fs_resolve",
                "fs_rmdir", "fs_search", "fs_write",
            ]
        );
        for name in names {
            let engine = registry.get_engine(&name).unwrap();
            assert!(engine.schema().is_some(), "{name} has no schema");
            assert_eq!(registry.get(&name).unwrap().category, FILE_CATEGORY);
        }
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let (_dir, registry) = setup();

        let res = registry
            .execute(
                "fs_write",
                r#"{"path": "notes/a.txt", "encoding": "text", "content": "hello", "create_dirs": true}"#,
            )
            .await
            .unwrap();
        assert!(res.success, "{}", res.stderr);
        let written: WriteResult = serde_json::from_str(&res.stdout).unwrap();
        assert!(written.created);
        assert_eq!(written.bytes, 5);

        let res = registry
            .execute("fs_read", r#"{"path": "notes/a.txt"}"#)
            .await
            .unwrap();
        let read: ReadResult = serde_json::from_str(&res.stdout).unwrap();
        assert_eq!(read.content, "hello");
        assert_eq!(read.path, "notes/a.txt");
    }

    #[tokio::test]
    async fn test_errors_are_structured() {
        let (_dir, registry) = setup();

        let res = registry.execute("fs_read", "not json").await.unwrap();
        assert_eq!(res.exit_code, 1);
        assert_eq!(res.parse_error().unwrap().code, ErrorCode::InvalidArgument);

        let res = registry
            .execute("fs_read", r#"{"path": "../outside"}"#)
            .await
            .unwrap();
        let err = res.parse_error().unwrap();
        assert_eq!(err.code, ErrorCode::PathEscape);
        assert_eq!(err.operation.as_deref(), Some("read"));

        let res = registry
            .execute("fs_read", r#"{"path": "missing.txt"}"#)
            .await
            .unwrap();
        assert_eq!(res.parse_error().unwrap().code, ErrorCode::NotFound);
    }

    #[test]
    fn test_interrupter_hands_out_fresh_tokens() {
        let interrupter = Interrupter::default();
        let before = interrupter.token();
        interrupter.interrupt();
        assert!(before.is_cancelled());
        assert!(!interrupter.token().is_cancelled());
    }

    #[tokio::test]
    async fn test_interrupt_leaves_engines_usable() {
        let (_dir, registry) = setup();
        registry.interrupt_all().await.unwrap();

        let res = registry
            .execute("fs_write", r#"{"path": "x.txt", "encoding": "text", "content": "x"}"#)
            .await
            .unwrap();
        assert!(res.success, "{}", res.stderr);
    }
}
