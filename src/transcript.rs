//! Turns stored history into the wire-message sequence a model call expects.
//!
//! Ordering is the causality signal: turns are never reordered, and a tool
//! result is only meaningful immediately after the request that produced it.
//! A result turn that has lost its request (corrupted persisted history) is
//! dropped with a warning rather than sent to the model.

use serde_json::{json, Value};
use tracing::warn;

use crate::types::{ChatTurn, ToolInvocationRequest};

/// Assemble stored turns into ordered wire messages, oldest first.
///
/// Calling this twice on the same history yields identical output; an empty
/// history assembles to an empty sequence.
pub fn assemble(turns: &[ChatTurn]) -> Vec<Value> {
    let mut messages = Vec::with_capacity(turns.len());

    for (index, turn) in turns.iter().enumerate() {
        match turn {
            ChatTurn::User { content } => {
                messages.push(json!({
                    "role": "user",
                    "content": [{ "text": content }],
                }));
            }
            ChatTurn::Assistant { content } => {
                messages.push(json!({
                    "role": "model",
                    "content": [{ "text": content }],
                }));
            }
            ChatTurn::ToolRequest { content, request } => {
                let mut blocks = Vec::with_capacity(2);
                if !content.is_empty() {
                    blocks.push(json!({ "text": content }));
                }
                blocks.push(json!({
                    "toolRequest": { "name": request.name, "input": request.input },
                }));
                messages.push(json!({
                    "role": "model",
                    "content": blocks,
                }));
            }
            ChatTurn::ToolResult {
                name,
                result,
                is_error,
            } => {
                if !pairs_with_previous(turns, index, name) {
                    warn!(turn = index, tool = %name, "dropping orphaned tool result turn");
                    continue;
                }
                let mut block = json!({ "name": name, "output": result });
                if *is_error {
                    block["isError"] = json!(true);
                }
                messages.push(json!({
                    "role": "tool",
                    "content": [{ "toolResult": block }],
                }));
            }
        }
    }

    messages
}

/// A tool result is paired iff the turn directly before it is the request
/// with the same name.
fn pairs_with_previous(turns: &[ChatTurn], index: usize, name: &str) -> bool {
    index > 0
        && matches!(
            &turns[index - 1],
            ChatTurn::ToolRequest { request, .. } if request.name == name
        )
}

/// Re-derive the turn list from an assembled sequence.
///
/// Inverse of [`assemble`] for any history that satisfies the pairing
/// invariant; used for history import and as the round-trip check in tests.
pub fn recover_turns(messages: &[Value]) -> Vec<ChatTurn> {
    let mut turns = Vec::with_capacity(messages.len());

    for message in messages {
        let blocks = message["content"].as_array().cloned().unwrap_or_default();
        match message["role"].as_str() {
            Some("user") => {
                let content = text_of(&blocks);
                turns.push(ChatTurn::User { content });
            }
            Some("model") => {
                let request = blocks.iter().find_map(|b| b.get("toolRequest"));
                match request {
                    Some(req) => turns.push(ChatTurn::ToolRequest {
                        content: text_of(&blocks),
                        request: ToolInvocationRequest {
                            name: req["name"].as_str().unwrap_or_default().to_string(),
                            input: req["input"].clone(),
                        },
                    }),
                    None => turns.push(ChatTurn::Assistant {
                        content: text_of(&blocks),
                    }),
                }
            }
            Some("tool") => {
                if let Some(res) = blocks.iter().find_map(|b| b.get("toolResult")) {
                    turns.push(ChatTurn::ToolResult {
                        name: res["name"].as_str().unwrap_or_default().to_string(),
                        result: res["output"].clone(),
                        is_error: res["isError"].as_bool().unwrap_or(false),
                    });
                }
            }
            _ => {}
        }
    }

    turns
}

fn text_of(blocks: &[Value]) -> String {
    blocks
        .iter()
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str) -> ToolInvocationRequest {
        ToolInvocationRequest {
            name: name.into(),
            input: json!({ "query": "piano" }),
        }
    }

    fn paired_history() -> Vec<ChatTurn> {
        vec![
            ChatTurn::user("find my piano goal"),
            ChatTurn::ToolRequest {
                content: "Let me look.".into(),
                request: request("findGoals"),
            },
            ChatTurn::ToolResult {
                name: "findGoals".into(),
                result: json!([{ "id": "g1", "title": "learn piano" }]),
                is_error: false,
            },
            ChatTurn::assistant("You have one piano goal."),
        ]
    }

    #[test]
    fn empty_history_assembles_to_empty_sequence() {
        assert!(assemble(&[]).is_empty());
    }

    #[test]
    fn preserves_order_and_roles() {
        let messages = assemble(&paired_history());
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "model");
        assert_eq!(messages[2]["role"], "tool");
        assert_eq!(messages[3]["role"], "model");

        // the result is tagged with the same tool name as the request
        assert_eq!(messages[1]["content"][1]["toolRequest"]["name"], "findGoals");
        assert_eq!(messages[2]["content"][0]["toolResult"]["name"], "findGoals");
    }

    #[test]
    fn empty_request_text_is_omitted() {
        let turns = vec![
            ChatTurn::user("go"),
            ChatTurn::ToolRequest {
                content: String::new(),
                request: request("getSchedule"),
            },
        ];
        let messages = assemble(&turns);
        let blocks = messages[1]["content"].as_array().unwrap();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].get("toolRequest").is_some());
    }

    #[test]
    fn assembly_is_idempotent() {
        let history = paired_history();
        assert_eq!(assemble(&history), assemble(&history));
    }

    #[test]
    fn orphaned_result_with_no_predecessor_is_dropped() {
        let turns = vec![
            ChatTurn::ToolResult {
                name: "findGoals".into(),
                result: json!([]),
                is_error: false,
            },
            ChatTurn::user("hello"),
        ];
        let messages = assemble(&turns);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
    }

    #[test]
    fn orphaned_result_with_mismatched_name_is_dropped() {
        let turns = vec![
            ChatTurn::user("go"),
            ChatTurn::ToolRequest {
                content: String::new(),
                request: request("findGoals"),
            },
            ChatTurn::ToolResult {
                name: "createGoal".into(),
                result: json!({}),
                is_error: false,
            },
        ];
        let messages = assemble(&turns);
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn duplicate_result_for_one_request_is_dropped() {
        let turns = vec![
            ChatTurn::user("go"),
            ChatTurn::ToolRequest {
                content: String::new(),
                request: request("findGoals"),
            },
            ChatTurn::ToolResult {
                name: "findGoals".into(),
                result: json!([]),
                is_error: false,
            },
            ChatTurn::ToolResult {
                name: "findGoals".into(),
                result: json!([]),
                is_error: false,
            },
        ];
        let messages = assemble(&turns);
        assert_eq!(messages.len(), 3);
    }

    #[test]
    fn round_trip_preserves_turns() {
        let mut history = paired_history();
        // an error-tagged result survives the round trip too
        history.push(ChatTurn::ToolRequest {
            content: String::new(),
            request: request("updateGoal"),
        });
        history.push(ChatTurn::ToolResult {
            name: "updateGoal".into(),
            result: json!({ "error": "goal g9 not found" }),
            is_error: true,
        });

        let recovered = recover_turns(&assemble(&history));
        assert_eq!(recovered, history);
    }
}
