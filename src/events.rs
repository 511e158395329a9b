use serde_json::Value;

/// Events emitted while a turn runs, for UI streaming.
#[derive(Debug, Clone)]
pub enum CoachEvent {
    /// A model call is starting. `round_trip` counts completed tool calls.
    TurnStart { round_trip: usize },
    Text { content: String },
    ToolCall { name: String, input: Value },
    ToolResult { name: String, output: Value, is_error: bool },
    AuthRequired { auth_url: String },
    Finished { round_trips: usize },
}
