use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One element of a stored conversation. The request/result pairing invariant
/// is structural: a `ToolResult` is only valid immediately after the
/// `ToolRequest` with the same name, and the assembler enforces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChatTurn {
    /// What the user typed.
    #[serde(rename_all = "camelCase")]
    User { content: String },
    /// Terminal assistant text for a turn.
    #[serde(rename_all = "camelCase")]
    Assistant { content: String },
    /// The assistant asked for a tool. `content` may be empty; some models
    /// emit no text before deciding to call.
    #[serde(rename_all = "camelCase")]
    ToolRequest {
        content: String,
        request: ToolInvocationRequest,
    },
    /// Outcome of the immediately preceding `ToolRequest`.
    #[serde(rename_all = "camelCase")]
    ToolResult {
        name: String,
        result: Value,
        #[serde(default)]
        is_error: bool,
    },
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        ChatTurn::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatTurn::Assistant {
            content: content.into(),
        }
    }
}

/// A tool invocation the model asked for. Ephemeral: consumed by the
/// executor, only the `{name, result}` pair is persisted into history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    pub name: String,
    /// Raw argument bag from the model, not yet validated.
    pub input: Value,
}

/// A successful tool invocation, ready to persist as a `ToolResult` turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub name: String,
    pub result: Value,
}

/// Identity of the authenticated caller. Sourced from the surrounding
/// session and stamped over the argument bag before validation, so the model
/// cannot impersonate another user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub user_id: String,
}

impl CallerContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Fully-formed request for one model call.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system: Option<String>,
    /// Capability descriptions of every registered tool.
    pub tools: Vec<Value>,
    /// Assembled wire messages, oldest first.
    pub messages: Vec<Value>,
}

/// What came back from the model: free text, and possibly a tool invocation
/// it wants executed before it can finish the turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    pub text: String,
    pub tool_request: Option<ToolInvocationRequest>,
}
