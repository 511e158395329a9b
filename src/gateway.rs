use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::GatewayError;
use crate::types::{ModelReply, ModelRequest, ToolInvocationRequest};

/// Pure model call. No state, no history, no tool execution.
/// Request in, reply out.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn generate(&self, request: ModelRequest) -> Result<ModelReply, GatewayError>;
}

/// Gemini API client via the generateContent endpoint.
pub struct GeminiGateway {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiGateway {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com".into(),
            model: "gemini-2.0-flash".into(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl ModelGateway for GeminiGateway {
    async fn generate(&self, request: ModelRequest) -> Result<ModelReply, GatewayError> {
        let mut body = json!({
            "contents": contents(&request.messages),
        });

        if let Some(ref system) = request.system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        if !request.tools.is_empty() {
            body["tools"] = json!([{ "functionDeclarations": request.tools }]);
        }

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let resp = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        if status != 200 {
            return Err(GatewayError::Api { status, body: text });
        }

        let parsed: Value =
            serde_json::from_str(&text).map_err(|e| GatewayError::Parse(e.to_string()))?;
        parse_reply(&parsed)
    }
}

/// Map assembled wire messages into Gemini contents. Tool results ride in a
/// user-role content with a functionResponse part; the API only knows the
/// roles "user" and "model".
fn contents(messages: &[Value]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            let blocks = message["content"].as_array().cloned().unwrap_or_default();
            let role = match message["role"].as_str() {
                Some("model") => "model",
                _ => "user",
            };

            let parts: Vec<Value> = blocks
                .iter()
                .filter_map(|block| {
                    if let Some(text) = block.get("text") {
                        Some(json!({ "text": text }))
                    } else if let Some(req) = block.get("toolRequest") {
                        Some(json!({
                            "functionCall": { "name": req["name"], "args": req["input"] },
                        }))
                    } else {
                        block.get("toolResult").map(|res| {
                            json!({
                                "functionResponse": {
                                    "name": res["name"],
                                    "response": response_object(res),
                                },
                            })
                        })
                    }
                })
                .collect();

            json!({ "role": role, "parts": parts })
        })
        .collect()
}

/// Gemini wants an object for functionResponse.response; wrap bare values.
fn response_object(result: &Value) -> Value {
    match &result["output"] {
        Value::Object(map) => Value::Object(map.clone()),
        other => json!({ "result": other }),
    }
}

fn parse_reply(parsed: &Value) -> Result<ModelReply, GatewayError> {
    let parts = parsed["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| GatewayError::Parse("response has no candidate parts".into()))?;

    let text = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("");

    let tool_request = parts
        .iter()
        .find_map(|p| p.get("functionCall"))
        .map(|call| ToolInvocationRequest {
            name: call["name"].as_str().unwrap_or_default().to_string(),
            input: call["args"].clone(),
        });

    Ok(ModelReply { text, tool_request })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_reply() {
        let raw = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Hello!" }] },
                "finishReason": "STOP",
            }],
        });
        let reply = parse_reply(&raw).unwrap();
        assert_eq!(reply.text, "Hello!");
        assert!(reply.tool_request.is_none());
    }

    #[test]
    fn parses_function_call_reply() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "On it." },
                        { "functionCall": { "name": "createGoal", "args": { "title": "learn piano" } } },
                    ],
                },
            }],
        });
        let reply = parse_reply(&raw).unwrap();
        assert_eq!(reply.text, "On it.");
        let request = reply.tool_request.unwrap();
        assert_eq!(request.name, "createGoal");
        assert_eq!(request.input["title"], "learn piano");
    }

    #[test]
    fn missing_candidates_is_a_parse_error() {
        let raw = json!({ "candidates": [] });
        assert!(matches!(
            parse_reply(&raw),
            Err(GatewayError::Parse(_))
        ));
    }

    #[test]
    fn tool_results_become_user_function_responses() {
        let messages = vec![json!({
            "role": "tool",
            "content": [{ "toolResult": { "name": "findGoals", "output": [{ "id": "g1" }] } }],
        })];
        let contents = contents(&messages);
        assert_eq!(contents[0]["role"], "user");
        let part = &contents[0]["parts"][0]["functionResponse"];
        assert_eq!(part["name"], "findGoals");
        // bare arrays are wrapped so the response is always an object
        assert_eq!(part["response"]["result"][0]["id"], "g1");
    }
}
