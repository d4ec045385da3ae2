//! GlobEngine: file pattern matching under the root.

use std::sync::Arc;

use async_trait::async_trait;
use confine_types::GlobArgs;

use crate::fs::ConfinedFs;
use crate::tools::{ExecResult, ExecutionEngine};

use super::{Interrupter, reply};

/// Engine for glob pattern matching over regular files.
pub struct GlobEngine {
    fs: Arc<ConfinedFs>,
    interrupter: Interrupter,
}

impl GlobEngine {
    pub fn new(fs: Arc<ConfinedFs>) -> Self {
        Self {
            fs,
            interrupter: Interrupter::default(),
        }
    }
}

#[async_trait]
impl ExecutionEngine for GlobEngine {
    fn name(&self) -> &str {
        "fs_glob"
    }

    fn description(&self) -> &str {
        "Find files matching a glob pattern (supports **, {a,b}, [abc])"
    }

    fn schema(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Glob pattern relative to the root (e.g., '**/*.rs', 'src/*.ts')"
                },
                "max_results": { "type": "integer", "description": "Maximum paths to return" }
            },
            "required": ["pattern"]
        }))
    }

    #[tracing::instrument(skip(self, params), name = "engine.glob")]
    async fn execute(&self, params: &str) -> anyhow::Result<ExecResult> {
        let args: GlobArgs = match serde_json::from_str(params) {
            Ok(v) => v,
            Err(e) => return ExecResult::invalid_params("glob", e),
        };
        reply(self.fs.glob(&args, &self.interrupter.token()).await)
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn interrupt(&self) -> anyhow::Result<()> {
        self.interrupter.interrupt();
        Ok(())
    }
}
