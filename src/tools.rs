//! Tool registry
//!
//! Tools are only ever run by the workflow's tool execution step, after a
//! human approved the request. The model sees names, descriptions and
//! schemas, nothing else.

mod slip;

pub use slip::{CreateInvestigationReportTool, SearchSlipInfoTool};

use async_trait::async_trait;
use jsonschema::Validator;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::llm::ToolDefinition;

/// Errors from registering or invoking a tool
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },
    #[error("Tool {tool} failed: {message}")]
    Execution { tool: String, message: String },
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),
    #[error("Invalid schema for {tool}: {message}")]
    InvalidSchema { tool: String, message: String },
}

/// A named capability with an argument schema
///
/// Handlers return plain structured data; any `Err` is reported back to the
/// model as an error tool result.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name
    fn name(&self) -> &str;

    /// Tool description for LLM
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    /// Execute with already-validated arguments
    async fn run(&self, input: Value) -> Result<Value, String>;
}

struct RegisteredTool {
    tool: Arc<dyn Tool>,
    validator: Validator,
}

/// Collection of tools available to the workflow
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the slip tracking tools
    pub fn standard() -> Result<Self, ToolError> {
        let mut registry = Self::new();
        registry.register(Arc::new(SearchSlipInfoTool))?;
        registry.register(Arc::new(CreateInvestigationReportTool))?;
        Ok(registry)
    }

    /// Register a tool under its unique name
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.tools.iter().any(|t| t.tool.name() == name) {
            return Err(ToolError::DuplicateTool(name));
        }

        let validator = Validator::new(&tool.input_schema()).map_err(|e| ToolError::InvalidSchema {
            tool: name.clone(),
            message: e.to_string(),
        })?;

        tracing::debug!(tool = %name, "Registered tool");
        self.tools.push(RegisteredTool { tool, validator });
        Ok(())
    }

    /// Get all tool definitions for LLM
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.tool.name().to_string(),
                description: t.tool.description(),
                input_schema: t.tool.input_schema(),
            })
            .collect()
    }

    /// Validate arguments and run the named tool
    pub async fn invoke(&self, name: &str, arguments: &Value) -> Result<Value, ToolError> {
        let entry = self
            .tools
            .iter()
            .find(|t| t.tool.name() == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        if !entry.validator.is_valid(arguments) {
            let violations: Vec<String> = entry
                .validator
                .iter_errors(arguments)
                .map(|e| e.to_string())
                .collect();
            return Err(ToolError::InvalidArguments {
                tool: name.to_string(),
                message: violations.join("; "),
            });
        }

        entry
            .tool
            .run(arguments.clone())
            .await
            .map_err(|message| ToolError::Execution {
                tool: name.to_string(),
                message,
            })
    }
}
