//! MkdirEngine and RmdirEngine.

use std::sync::Arc;

use async_trait::async_trait;
use confine_types::{MkdirArgs, RmdirArgs};

use crate::fs::ConfinedFs;
use crate::tools::{ExecResult, ExecutionEngine};

use super::reply;

/// Engine for creating directories, with brace expansion.
pub struct MkdirEngine {
    fs: Arc<ConfinedFs>,
}

impl MkdirEngine {
    pub fn new(fs: Arc<ConfinedFs>) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl ExecutionEngine for MkdirEngine {
    fn name(&self) -> &str {
        "fs_mkdir"
    }

    fn description(&self) -> &str {
        "Create directories; 'a/{b,c}' creates a/b and a/c"
    }

    fn schema(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Directory path relative to the root" },
                "mode": { "type": "string", "description": "Octal permissions (default: \"0755\")" },
                "parents": { "type": "boolean", "description": "Create missing parents (default: true)" },
                "brace_expand": { "type": "boolean", "description": "Expand {a,b} groups (default: true)" }
            },
            "required": ["path"]
        }))
    }

    #[tracing::instrument(skip(self, params), name = "engine.mkdir")]
    async fn execute(&self, params: &str) -> anyhow::Result<ExecResult> {
        let args: MkdirArgs = match serde_json::from_str(params) {
            Ok(v) => v,
            Err(e) => return ExecResult::invalid_params("mkdir", e),
        };
        reply(self.fs.mkdir(&args).await)
    }

    async fn is_available(&self) -> bool {
        true
    }
}

/// Engine for removing directories.
pub struct RmdirEngine {
    fs: Arc<ConfinedFs>,
}

impl RmdirEngine {
    pub fn new(fs: Arc<ConfinedFs>) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl ExecutionEngine for RmdirEngine {
    fn name(&self) -> &str {
        "fs_rmdir"
    }

    fn description(&self) -> &str {
        "Remove a directory (recursive removes its contents too)"
    }

    fn schema(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Directory path relative to the root" },
                "recursive": { "type": "boolean", "description": "Remove contents as well (default: false)" }
            },
            "required": ["path"]
        }))
    }

    #[tracing::instrument(skip(self, params), name = "engine.rmdir")]
    async fn execute(&self, params: &str) -> anyhow::Result<ExecResult> {
        let args: RmdirArgs = match serde_json::from_str(params) {
            Ok(v) => v,
            Err(e) => return ExecResult::invalid_params("rmdir", e),
        };
        reply(self.fs.rmdir(&args).await)
    }

    async fn is_available(&self) -> bool {
        true
    }
}
