//! EditEngine: find and replace inside a file.

use std::sync::Arc;

use async_trait::async_trait;
use confine_types::EditArgs;

use crate::fs::ConfinedFs;
use crate::tools::{ExecResult, ExecutionEngine};

use super::{Interrupter, reply};

/// Engine for literal or regex replacement within a single file.
pub struct EditEngine {
    fs: Arc<ConfinedFs>,
    interrupter: Interrupter,
}

impl EditEngine {
    pub fn new(fs: Arc<ConfinedFs>) -> Self {
        Self {
            fs,
            interrupter: Interrupter::default(),
        }
    }
}

#[async_trait]
impl ExecutionEngine for EditEngine {
    fn name(&self) -> &str {
        "fs_edit"
    }

    fn description(&self) -> &str {
        "Replace occurrences of a literal string or regex in a file"
    }

    fn schema(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File path relative to the root" },
                "pattern": { "type": "string", "description": "Text or regex to find" },
                "replace": { "type": "string", "description": "Replacement ($1 etc. expand in regex mode)" },
                "regex": { "type": "boolean", "description": "Treat pattern as a regex (default: false)" },
                "count": { "type": "integer", "description": "Maximum replacements, 0 for all (default: 0)" }
            },
            "required": ["path", "pattern"]
        }))
    }

    #[tracing::instrument(skip(self, params), name = "engine.edit")]
    async fn execute(&self, params: &str) -> anyhow::Result<ExecResult> {
        let args: EditArgs = match serde_json::from_str(params) {
            Ok(v) => v,
            Err(e) => return ExecResult::invalid_params("edit", e),
        };
        reply(self.fs.edit(&args, &self.interrupter.token()).await)
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn interrupt(&self) -> anyhow::Result<()> {
        self.interrupter.interrupt();
        Ok(())
    }
}
