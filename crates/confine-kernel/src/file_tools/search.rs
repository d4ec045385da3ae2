//! SearchEngine: concurrent content search.

use std::sync::Arc;

use async_trait::async_trait;
use confine_types::SearchArgs;

use crate::fs::ConfinedFs;
use crate::tools::{ExecResult, ExecutionEngine};

use super::{Interrupter, reply};

/// Engine for searching file contents line by line.
pub struct SearchEngine {
    fs: Arc<ConfinedFs>,
    interrupter: Interrupter,
}

impl SearchEngine {
    pub fn new(fs: Arc<ConfinedFs>) -> Self {
        Self {
            fs,
            interrupter: Interrupter::default(),
        }
    }
}

#[async_trait]
impl ExecutionEngine for SearchEngine {
    fn name(&self) -> &str {
        "fs_search"
    }

    fn description(&self) -> &str {
        "Search file contents for a literal or regex pattern (binary files skipped)"
    }

    fn schema(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string", "description": "Text or regex to search for" },
                "path": { "type": "string", "description": "Directory or file to search (default: root)" },
                "regex": { "type": "boolean", "description": "Treat pattern as a regex (default: false)" },
                "max_results": { "type": "integer", "description": "Maximum matches to return" }
            },
            "required": ["pattern"]
        }))
    }

    #[tracing::instrument(skip(self, params), name = "engine.search")]
    async fn execute(&self, params: &str) -> anyhow::Result<ExecResult> {
        let args: SearchArgs = match serde_json::from_str(params) {
            Ok(v) => v,
            Err(e) => return ExecResult::invalid_params("search", e),
        };
        reply(self.fs.search(&args, &self.interrupter.token()).await)
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn interrupt(&self) -> anyhow::Result<()> {
        self.interrupter.interrupt();
        Ok(())
    }
}
