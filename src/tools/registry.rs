use std::fmt;

use serde_json::Value;

use crate::error::ToolError;
use crate::tools::handler::ToolDefinition;

/// Catalog of invocable operations. Initialized once at process start,
/// immutable afterwards, and passed by reference into the orchestration
/// loop; there is no process-global registry.
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Add a tool. Names are part of the wire contract between model and
    /// executor, so a duplicate is a wiring bug, not a runtime condition.
    pub fn register(mut self, definition: ToolDefinition) -> Result<Self, ToolError> {
        if self.tools.iter().any(|t| t.name == definition.name) {
            return Err(ToolError::Duplicate {
                name: definition.name.to_string(),
            });
        }
        self.tools.push(definition);
        Ok(self)
    }

    /// Look up a definition for dispatch.
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Capability descriptions for the model, in registration order.
    pub fn wire_schemas(&self) -> Vec<Value> {
        self.tools.iter().map(|t| t.wire()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
