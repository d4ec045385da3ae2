//! ReadEngine and PeekEngine: bounded file reads.

use std::sync::Arc;

use async_trait::async_trait;
use confine_types::{PeekArgs, ReadArgs};

use crate::fs::ConfinedFs;
use crate::tools::{ExecResult, ExecutionEngine};

use super::reply;

/// Engine for reading a file from its start.
pub struct ReadEngine {
    fs: Arc<ConfinedFs>,
}

impl ReadEngine {
    pub fn new(fs: Arc<ConfinedFs>) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl ExecutionEngine for ReadEngine {
    fn name(&self) -> &str {
        "fs_read"
    }

    fn description(&self) -> &str {
        "Read a file with metadata, MIME type and SHA-256 (bounded by max_bytes)"
    }

    fn schema(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path relative to the root, or a file:// URI"
                },
                "encoding": {
                    "type": "string",
                    "enum": ["text", "base64"],
                    "description": "Output encoding (default: detected from content)"
                },
                "max_bytes": {
                    "type": "integer",
                    "description": "Maximum bytes to return"
                }
            },
            "required": ["path"]
        }))
    }

    #[tracing::instrument(skip(self, params), name = "engine.read")]
    async fn execute(&self, params: &str) -> anyhow::Result<ExecResult> {
        let args: ReadArgs = match serde_json::from_str(params) {
            Ok(v) => v,
            Err(e) => return ExecResult::invalid_params("read", e),
        };
        reply(self.fs.read(&args).await)
    }

    async fn is_available(&self) -> bool {
        true
    }
}

/// Engine for reading a window of a file at an offset.
pub struct PeekEngine {
    fs: Arc<ConfinedFs>,
}

impl PeekEngine {
    pub fn new(fs: Arc<ConfinedFs>) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl ExecutionEngine for PeekEngine {
    fn name(&self) -> &str {
        "fs_peek"
    }

    fn description(&self) -> &str {
        "Read a byte window of a file starting at an offset"
    }

    fn schema(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File path relative to the root" },
                "offset": { "type": "integer", "description": "Byte offset to start from (default: 0)" },
                "max_bytes": { "type": "integer", "description": "Window size in bytes" },
                "encoding": { "type": "string", "enum": ["text", "base64"] }
            },
            "required": ["path"]
        }))
    }

    #[tracing::instrument(skip(self, params), name = "engine.peek")]
    async fn execute(&self, params: &str) -> anyhow::Result<ExecResult> {
        let args: PeekArgs = match serde_json::from_str(params) {
            Ok(v) => v,
            Err(e) => return ExecResult::invalid_params("peek", e),
        };
        reply(self.fs.peek(&args).await)
    }

    async fn is_available(&self) -> bool {
        true
    }
}
