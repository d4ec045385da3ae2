//! ResolveEngine: path validation without touching content.

use std::sync::Arc;

use async_trait::async_trait;
use confine_types::ResolveArgs;

use crate::fs::ConfinedFs;
use crate::tools::{ExecResult, ExecutionEngine};

use super::reply;

pub struct ResolveEngine {
    fs: Arc<ConfinedFs>,
}

impl ResolveEngine {
    pub fn new(fs: Arc<ConfinedFs>) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl ExecutionEngine for ResolveEngine {
    fn name(&self) -> &str {
        "fs_resolve"
    }

    fn description(&self) -> &str {
        "Validate a path or file:// URI and return its location under the root"
    }

    fn schema(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Path or file:// URI" },
                "mode": {
                    "type": "string",
                    "enum": ["parent_resolved", "fully_resolved"],
                    "description": "Whether the final component is also resolved (default: parent_resolved)"
                }
            },
            "required": ["path"]
        }))
    }

    #[tracing::instrument(skip(self, params), name = "engine.resolve")]
    async fn execute(&self, params: &str) -> anyhow::Result<ExecResult> {
        let args: ResolveArgs = match serde_json::from_str(params) {
            Ok(v) => v,
            Err(e) => return ExecResult::invalid_params("resolve", e),
        };
        reply(self.fs.resolve(&args))
    }

    async fn is_available(&self) -> bool {
        true
    }
}
