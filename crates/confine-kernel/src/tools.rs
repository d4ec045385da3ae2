//! Tool registry and execution engines.
//!
//! Every filesystem operation is exposed as an [`ExecutionEngine`]: JSON
//! parameters in, an [`ExecResult`] out. Transport framing is left to whatever
//! embeds the registry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use confine_types::{ErrorCode, ErrorResponse};

use crate::error::FsError;

// ============================================================================
// Tool Info
// ============================================================================

/// Information about a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name (unique identifier).
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Tool category (e.g., "file").
    pub category: String,
}

impl ToolInfo {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category: category.into(),
        }
    }
}

/// Result of executing a tool.
///
/// Successful calls carry their JSON result on stdout; failures carry an
/// [`ErrorResponse`] as JSON on stderr.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    /// Exit code (0 = success).
    pub exit_code: i32,
    pub success: bool,
}

impl ExecResult {
    /// Create a successful result.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
            success: true,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
            success: false,
        }
    }

    /// Serialize `value` onto stdout.
    pub fn json<T: Serialize>(value: &T) -> anyhow::Result<Self> {
        Ok(Self::success(serde_json::to_string(value)?))
    }

    /// Report an error payload on stderr with exit code 1.
    pub fn error_response(response: &ErrorResponse) -> anyhow::Result<Self> {
        Ok(Self::failure(1, serde_json::to_string(response)?))
    }

    /// Report a kernel error.
    pub fn fs_error(err: &FsError) -> anyhow::Result<Self> {
        Self::error_response(&err.to_response())
    }

    /// Report unparseable parameters.
    pub fn invalid_params(operation: &str, err: impl std::fmt::Display) -> anyhow::Result<Self> {
        Self::error_response(&ErrorResponse {
            error: format!("Invalid params: {err}"),
            code: ErrorCode::InvalidArgument,
            operation: Some(operation.to_string()),
            path: None,
        })
    }

    /// Parse the stderr payload back into an [`ErrorResponse`].
    pub fn parse_error(&self) -> Option<ErrorResponse> {
        if self.success {
            return None;
        }
        serde_json::from_str(&self.stderr).ok()
    }
}

/// Trait for execution engines.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Get the engine name.
    fn name(&self) -> &str;

    /// Get the engine description.
    fn description(&self) -> &str;

    /// Execute with JSON parameters and return the result.
    async fn execute(&self, params: &str) -> anyhow::Result<ExecResult>;

    /// Check if this engine is available/ready.
    async fn is_available(&self) -> bool;

    /// Interrupt a running execution.
    async fn interrupt(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Get the JSON Schema for tool input parameters.
    fn schema(&self) -> Option<serde_json::Value> {
        None
    }
}

/// Registry of tools and their execution engines.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolInfo>,
    engines: HashMap<String, Arc<dyn ExecutionEngine>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools)
            .field("engines", &self.engines.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool with an execution engine.
    pub fn register_with_engine(&mut self, info: ToolInfo, engine: Arc<dyn ExecutionEngine>) {
        let name = info.name.clone();
        self.tools.insert(name.clone(), info);
        self.engines.insert(name, engine);
    }

    /// Register an engine under its own name and description.
    pub fn register_engine(&mut self, category: &str, engine: Arc<dyn ExecutionEngine>) {
        let info = ToolInfo::new(engine.name(), engine.description(), category);
        self.register_with_engine(info, engine);
    }

    /// Get a tool's info.
    pub fn get(&self, name: &str) -> Option<&ToolInfo> {
        self.tools.get(name)
    }

    /// Get an engine for a tool.
    pub fn get_engine(&self, name: &str) -> Option<Arc<dyn ExecutionEngine>> {
        self.engines.get(name).cloned()
    }

    /// List all tools, sorted by name.
    pub fn list(&self) -> Vec<&ToolInfo> {
        let mut tools: Vec<_> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Check if a tool has an engine registered.
    pub fn has_engine(&self, name: &str) -> bool {
        self.engines.contains_key(name)
    }

    /// Execute a tool by name.
    pub async fn execute(&self, name: &str, params: &str) -> anyhow::Result<ExecResult> {
        match self.get_engine(name) {
            Some(engine) => engine.execute(params).await,
            None => ExecResult::error_response(&ErrorResponse {
                error: format!("unknown tool: {name}"),
                code: ErrorCode::InvalidArgument,
                operation: Some(name.to_string()),
                path: None,
            }),
        }
    }

    /// Interrupt every engine's in-flight work.
    pub async fn interrupt_all(&self) -> anyhow::Result<()> {
        for engine in self.engines.values() {
            engine.interrupt().await?;
        }
        Ok(())
    }
}
