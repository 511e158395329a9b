use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::HandlerError;
use crate::tools::schema::InputSchema;

/// A tool's execution handler. Receives input the executor has already
/// validated and stamped with the caller's identity.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, input: Value) -> Result<Value, HandlerError>;
}

/// A registered operation: schema for the model, handler for execution.
/// Built once at startup and never mutated per-request.
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: InputSchema,
    /// Shape of the result, for the capability description. Documentation
    /// only; results are not validated against it at runtime.
    pub output_schema: Value,
    pub(crate) handler: Box<dyn ToolHandler>,
}

impl ToolDefinition {
    pub fn new(
        name: &'static str,
        description: &'static str,
        input_schema: InputSchema,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        Self {
            name,
            description,
            input_schema,
            output_schema: json!({ "type": "object" }),
            handler: Box::new(handler),
        }
    }

    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = schema;
        self
    }

    /// Capability description sent to the model.
    pub fn wire(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.input_schema.to_wire(),
        })
    }
}

/// Deserialize validated input into a handler's typed argument struct.
/// Shape mismatches here mean the schema and the struct disagree, which is a
/// bug in the tool definition, not in the model's input.
pub fn parse_input<T: DeserializeOwned>(input: Value) -> Result<T, HandlerError> {
    serde_json::from_value(input).map_err(|e| HandlerError::Other(format!("input decode: {e}")))
}
