//! ListEngine: directory listing.

use std::sync::Arc;

use async_trait::async_trait;
use confine_types::ListArgs;

use crate::fs::ConfinedFs;
use crate::tools::{ExecResult, ExecutionEngine};

use super::{Interrupter, reply};

/// Engine for listing a directory, optionally recursively.
pub struct ListEngine {
    fs: Arc<ConfinedFs>,
    interrupter: Interrupter,
}

impl ListEngine {
    pub fn new(fs: Arc<ConfinedFs>) -> Self {
        Self {
            fs,
            interrupter: Interrupter::default(),
        }
    }
}

#[async_trait]
impl ExecutionEngine for ListEngine {
    fn name(&self) -> &str {
        "fs_list"
    }

    fn description(&self) -> &str {
        "List directory entries with kind, size, mode and mtime"
    }

    fn schema(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Directory relative to the root (default: root)" },
                "recursive": { "type": "boolean", "description": "Descend into subdirectories" },
                "max_entries": { "type": "integer", "description": "Maximum entries to return" }
            }
        }))
    }

    #[tracing::instrument(skip(self, params), name = "engine.list")]
    async fn execute(&self, params: &str) -> anyhow::Result<ExecResult> {
        let args: ListArgs = match serde_json::from_str(params) {
            Ok(v) => v,
            Err(e) => return ExecResult::invalid_params("list", e),
        };
        reply(self.fs.list(&args, &self.interrupter.token()).await)
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn interrupt(&self) -> anyhow::Result<()> {
        self.interrupter.interrupt();
        Ok(())
    }
}
