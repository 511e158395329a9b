pub mod actions;
pub mod calendar;
pub mod domain;
pub mod error;
pub mod events;
pub mod gateway;
pub mod history;
pub mod store;
pub mod tools;
pub mod transcript;
pub mod types;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use actions::{Actions, CreateGoalParams, GoalSummary, UpdateGoalParams};
pub use calendar::{
    CalendarError, CalendarProvider, GoogleCalendarProvider, MemoryTokenStore, TokenStore,
};
pub use domain::{
    CalendarEvent, DailySchedule, EventDraft, Goal, GoalPriority, GoalStatus, ScheduledItem, Task,
    WeeklySchedule,
};
pub use error::{CoachError, GatewayError, HandlerError, ToolError};
pub use events::CoachEvent;
pub use gateway::{GeminiGateway, ModelGateway};
pub use history::{FileHistoryStore, HistoryStore, MemoryHistoryStore};
pub use store::{MemoryRepository, Repository, RepositoryError};
pub use tools::{standard_registry, ToolDefinition, ToolExecutor, ToolHandler, ToolRegistry};
pub use types::{
    CallerContext, ChatTurn, ModelReply, ModelRequest, ToolInvocationRequest, ToolOutcome,
};

/// Coach persona, from the app's system prompt. The user's ID is appended
/// per turn: the model needs it to discuss tools, but never decides it.
const PERSONA: &str = "\
You are an AI coach named Zenith Flow. Your goal is to help users achieve \
their goals by providing supportive, insightful, and actionable advice. Keep \
your responses concise and encouraging.

You have access to tools to help the user manage their goals and schedule.
- When a user asks you to create a goal, use the createGoal tool.
- When a user asks you to improve or modify a goal, first find it with the \
findGoals tool to get its ID, then use the updateGoal tool. Always confirm \
with the user before updating a goal.
- You can only see the user's goals by using the findGoals tool.";

/// Coach configuration.
#[derive(Debug, Clone)]
pub struct CoachConfig {
    pub persona: String,
    /// Tool executions allowed within one user turn.
    pub max_tool_round_trips: usize,
    /// Shown when the round-trip cap is hit.
    pub fallback_message: String,
    /// Shown when a tool needs the user to re-authenticate.
    pub reauth_message: String,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            persona: PERSONA.into(),
            max_tool_round_trips: 4,
            fallback_message: "I couldn't finish that request, it took more steps than \
                               expected. Could you try rephrasing it?"
                .into(),
            reauth_message: "I need access to your calendar to do that. Please reconnect \
                             your Google Calendar, then ask me again."
                .into(),
        }
    }
}

/// Result of one user turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Reply { text: String },
    /// A tool's collaborator needs the user to re-authenticate. `auth_url`
    /// is the consent URL to redirect to; `text` is what was said in chat.
    AuthRequired { text: String, auth_url: String },
}

impl TurnOutcome {
    pub fn text(&self) -> &str {
        match self {
            TurnOutcome::Reply { text } => text,
            TurnOutcome::AuthRequired { text, .. } => text,
        }
    }
}

/// The coach. Wire up a model gateway and a tool registry, and drive turns.
///
/// One turn is an explicit state loop: call the model; if it requests a
/// tool, execute it, append the result, and call the model again, bounded
/// by the round-trip cap; otherwise the reply text ends the turn. The only
/// state shared between concurrent turns is the immutable registry.
pub struct Coach {
    gateway: Box<dyn ModelGateway>,
    registry: Arc<ToolRegistry>,
    executor: ToolExecutor,
    config: CoachConfig,
}

impl Coach {
    pub fn new(
        gateway: impl ModelGateway + 'static,
        registry: ToolRegistry,
        config: CoachConfig,
    ) -> Self {
        let registry = Arc::new(registry);
        Self {
            gateway: Box::new(gateway),
            executor: ToolExecutor::new(registry.clone()),
            registry,
            config,
        }
    }

    /// Typed, model-free entry points over the same registry.
    pub fn actions(&self) -> Actions {
        Actions::new(self.registry.clone())
    }

    /// Run one user turn, appending everything that happened to `history`.
    pub async fn handle_turn(
        &self,
        history: &mut Vec<ChatTurn>,
        message: &str,
        context: &CallerContext,
    ) -> Result<TurnOutcome, CoachError> {
        self.run_turn(history, message, context, None, None).await
    }

    /// Turn with cancellation support. Once the token fires, nothing more is
    /// appended to `history`.
    pub async fn handle_turn_with_cancel(
        &self,
        history: &mut Vec<ChatTurn>,
        message: &str,
        context: &CallerContext,
        cancel: CancellationToken,
    ) -> Result<TurnOutcome, CoachError> {
        self.run_turn(history, message, context, Some(cancel), None)
            .await
    }

    /// Turn with streaming events.
    pub async fn handle_turn_streaming(
        &self,
        history: &mut Vec<ChatTurn>,
        message: &str,
        context: &CallerContext,
        tx: tokio::sync::mpsc::Sender<CoachEvent>,
    ) -> Result<TurnOutcome, CoachError> {
        self.run_turn(history, message, context, None, Some(tx))
            .await
    }

    fn system_prompt(&self, context: &CallerContext) -> String {
        format!(
            "{}\n\nThe user's ID is: {}.",
            self.config.persona, context.user_id
        )
    }

    async fn run_turn(
        &self,
        history: &mut Vec<ChatTurn>,
        message: &str,
        context: &CallerContext,
        cancel: Option<CancellationToken>,
        tx: Option<tokio::sync::mpsc::Sender<CoachEvent>>,
    ) -> Result<TurnOutcome, CoachError> {
        history.push(ChatTurn::user(message));

        let mut round_trips = 0;
        loop {
            if let Some(ref cancel) = cancel {
                if cancel.is_cancelled() {
                    info!(round_trips, "turn cancelled");
                    return Err(CoachError::Cancelled);
                }
            }

            if let Some(ref tx) = tx {
                let _ = tx
                    .send(CoachEvent::TurnStart {
                        round_trip: round_trips,
                    })
                    .await;
            }

            let request = ModelRequest {
                system: Some(self.system_prompt(context)),
                tools: self.registry.wire_schemas(),
                messages: transcript::assemble(history),
            };

            let reply = if let Some(ref cancel) = cancel {
                tokio::select! {
                    result = self.gateway.generate(request) => result?,
                    _ = cancel.cancelled() => {
                        info!(round_trips, "turn cancelled during model call");
                        return Err(CoachError::Cancelled);
                    }
                }
            } else {
                self.gateway.generate(request).await?
            };

            // No tool request: the reply text ends the turn.
            let Some(tool_request) = reply.tool_request else {
                history.push(ChatTurn::assistant(reply.text.clone()));
                if let Some(ref tx) = tx {
                    let _ = tx
                        .send(CoachEvent::Text {
                            content: reply.text.clone(),
                        })
                        .await;
                    let _ = tx.send(CoachEvent::Finished { round_trips }).await;
                }
                info!(round_trips, "turn finished");
                return Ok(TurnOutcome::Reply { text: reply.text });
            };

            if round_trips == self.config.max_tool_round_trips {
                warn!(
                    cap = self.config.max_tool_round_trips,
                    tool = %tool_request.name,
                    "tool round-trip cap reached, ending turn with fallback"
                );
                let text = self.config.fallback_message.clone();
                history.push(ChatTurn::assistant(text.clone()));
                if let Some(ref tx) = tx {
                    let _ = tx.send(CoachEvent::Text { content: text.clone() }).await;
                    let _ = tx.send(CoachEvent::Finished { round_trips }).await;
                }
                return Ok(TurnOutcome::Reply { text });
            }
            round_trips += 1;

            if let Some(ref tx) = tx {
                let _ = tx
                    .send(CoachEvent::ToolCall {
                        name: tool_request.name.clone(),
                        input: tool_request.input.clone(),
                    })
                    .await;
            }
            history.push(ChatTurn::ToolRequest {
                content: reply.text,
                request: tool_request.clone(),
            });

            match self.executor.execute(&tool_request, context).await {
                Ok(outcome) => {
                    if let Some(ref tx) = tx {
                        let _ = tx
                            .send(CoachEvent::ToolResult {
                                name: outcome.name.clone(),
                                output: outcome.result.clone(),
                                is_error: false,
                            })
                            .await;
                    }
                    history.push(ChatTurn::ToolResult {
                        name: outcome.name,
                        result: outcome.result,
                        is_error: false,
                    });
                }
                Err(ToolError::AuthRequired { auth_url }) => {
                    // The model cannot fix credentials, so it is not called
                    // again. A tool-result records the failure for later
                    // turns; the structured outcome carries the consent URL.
                    warn!(tool = %tool_request.name, "tool needs re-authentication");
                    history.push(ChatTurn::ToolResult {
                        name: tool_request.name.clone(),
                        result: serde_json::json!({ "error": "calendar authorization required" }),
                        is_error: true,
                    });
                    let text = self.config.reauth_message.clone();
                    history.push(ChatTurn::assistant(text.clone()));
                    if let Some(ref tx) = tx {
                        let _ = tx
                            .send(CoachEvent::AuthRequired {
                                auth_url: auth_url.clone(),
                            })
                            .await;
                        let _ = tx.send(CoachEvent::Finished { round_trips }).await;
                    }
                    return Ok(TurnOutcome::AuthRequired { text, auth_url });
                }
                Err(err) => {
                    // Recoverable within the conversation: the error payload
                    // goes back to the model so it can acknowledge the
                    // failure in its own words.
                    warn!(tool = %tool_request.name, error = %err, "tool call failed");
                    let payload = err.to_payload();
                    if let Some(ref tx) = tx {
                        let _ = tx
                            .send(CoachEvent::ToolResult {
                                name: tool_request.name.clone(),
                                output: payload.clone(),
                                is_error: true,
                            })
                            .await;
                    }
                    history.push(ChatTurn::ToolResult {
                        name: tool_request.name.clone(),
                        result: payload,
                        is_error: true,
                    });
                }
            }
        }
    }
}
