use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error};

use crate::calendar::CalendarError;
use crate::error::{HandlerError, ToolError};
use crate::tools::registry::ToolRegistry;
use crate::types::{CallerContext, ToolInvocationRequest, ToolOutcome};

/// Turns a tool invocation request plus a caller identity into a result.
///
/// The executor itself is side-effect-free beyond dispatch; whatever the
/// handler does lands in the external repository or calendar.
#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn execute(
        &self,
        request: &ToolInvocationRequest,
        context: &CallerContext,
    ) -> Result<ToolOutcome, ToolError> {
        let definition = self
            .registry
            .get(&request.name)
            .ok_or_else(|| ToolError::UnknownTool {
                name: request.name.clone(),
            })?;

        // Stamp the caller's identity over whatever the model supplied; the
        // model never chooses whose data a tool touches.
        let mut input = match &request.input {
            Value::Object(map) => Value::Object(map.clone()),
            Value::Null => json!({}),
            other => other.clone(),
        };
        if let Some(map) = input.as_object_mut() {
            map.insert("userId".to_string(), json!(context.user_id));
        }

        let validated =
            definition
                .input_schema
                .validate(&input)
                .map_err(|violations| ToolError::InvalidInput {
                    name: request.name.clone(),
                    violations,
                })?;

        debug!(tool = %request.name, "executing tool");

        match definition.handler.call(validated).await {
            Ok(result) => Ok(ToolOutcome {
                name: request.name.clone(),
                result,
            }),
            Err(HandlerError::Calendar(CalendarError::AuthRequired { auth_url })) => {
                Err(ToolError::AuthRequired { auth_url })
            }
            Err(source) => {
                error!(tool = %request.name, error = %source, "tool handler failed");
                Err(ToolError::Execution {
                    name: request.name.clone(),
                    source,
                })
            }
        }
    }
}
