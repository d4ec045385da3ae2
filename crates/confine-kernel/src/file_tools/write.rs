//! WriteEngine: atomic writes under the advisory lock.

use std::sync::Arc;

use async_trait::async_trait;
use confine_types::WriteArgs;

use crate::fs::ConfinedFs;
use crate::tools::{ExecResult, ExecutionEngine};

use super::{Interrupter, reply};

/// Engine for writing files with one of the write strategies.
pub struct WriteEngine {
    fs: Arc<ConfinedFs>,
    interrupter: Interrupter,
}

impl WriteEngine {
    pub fn new(fs: Arc<ConfinedFs>) -> Self {
        Self {
            fs,
            interrupter: Interrupter::default(),
        }
    }
}

#[async_trait]
impl ExecutionEngine for WriteEngine {
    fn name(&self) -> &str {
        "fs_write"
    }

    fn description(&self) -> &str {
        "Write a file atomically (overwrite, no_clobber, append, prepend, replace_range)"
    }

    fn schema(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File path relative to the root" },
                "encoding": {
                    "type": "string",
                    "enum": ["text", "base64"],
                    "description": "Encoding of content"
                },
                "content": { "type": "string", "description": "Payload" },
                "strategy": {
                    "type": "string",
                    "enum": ["overwrite", "no_clobber", "append", "prepend", "replace_range"],
                    "description": "How the payload combines with existing bytes (default: overwrite)"
                },
                "start": { "type": "integer", "description": "Range start for replace_range" },
                "end": { "type": "integer", "description": "Range end (exclusive) for replace_range" },
                "create_dirs": { "type": "boolean", "description": "Create missing parent directories" },
                "mode": { "type": "string", "description": "Octal permissions, e.g. \"0644\"" }
            },
            "required": ["path", "encoding", "content"]
        }))
    }

    #[tracing::instrument(skip(self, params), name = "engine.write")]
    async fn execute(&self, params: &str) -> anyhow::Result<ExecResult> {
        let args: WriteArgs = match serde_json::from_str(params) {
            Ok(v) => v,
            Err(e) => return ExecResult::invalid_params("write", e),
        };
        reply(self.fs.write(&args, &self.interrupter.token()).await)
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn interrupt(&self) -> anyhow::Result<()> {
        self.interrupter.interrupt();
        Ok(())
    }
}
