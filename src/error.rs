use serde_json::{json, Value};

use crate::calendar::CalendarError;
use crate::store::RepositoryError;
use crate::tools::schema::Violation;

/// Errors that are fatal for a user turn. Anything a tool handler produces is
/// recoverable within the conversation and lives in [`ToolError`] instead.
#[derive(Debug, thiserror::Error)]
pub enum CoachError {
    #[error("model gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("turn cancelled")]
    Cancelled,
    #[error("history store error: {0}")]
    History(String),
}

/// The model call itself failed. Bubbles to the caller untouched.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
}

/// Outcome of a failed tool invocation.
///
/// Everything except `AuthRequired` is fed back into the conversation as an
/// error-tagged tool result so the model can acknowledge the failure in text.
/// `AuthRequired` ends the turn with a structured re-authentication outcome.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {name}")]
    UnknownTool { name: String },
    #[error("tool already registered: {name}")]
    Duplicate { name: String },
    #[error("invalid input for {name}: {}", format_violations(.violations))]
    InvalidInput {
        name: String,
        violations: Vec<Violation>,
    },
    #[error("tool {name} failed: {source}")]
    Execution {
        name: String,
        #[source]
        source: HandlerError,
    },
    #[error("calendar authorization required")]
    AuthRequired { auth_url: String },
    #[error("unexpected tool result shape: {0}")]
    ResultShape(String),
}

impl ToolError {
    /// JSON payload stored in the error-tagged tool-result turn.
    pub fn to_payload(&self) -> Value {
        match self {
            ToolError::InvalidInput { violations, .. } => json!({
                "error": self.to_string(),
                "violations": violations,
            }),
            other => json!({ "error": other.to_string() }),
        }
    }
}

/// Failure raised inside a tool handler. Wrapped by the executor as
/// [`ToolError::Execution`], except for expired calendar credentials which
/// pass through as [`ToolError::AuthRequired`].
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error("{0}")]
    Other(String),
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
