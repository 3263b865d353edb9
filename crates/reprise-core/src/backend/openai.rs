//! OpenAI-compatible chat completions backend

use crate::backend::ModelBackend;
use crate::config::BackendConfig;
use crate::error::{RepriseError, RepriseResult};
use crate::replay::composer::ComposedRequest;
use crate::transcript::message::{MessageRole, ToolDefinition, TranscriptMessage};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

/// Keys a request body owns outright; captured extra settings never replace
/// them.
const RESERVED_KEYS: [&str; 3] = ["model", "messages", "tools"];

/// Backend for any provider speaking the OpenAI `chat/completions` dialect
/// (OpenAI, OpenRouter, Azure-compatible gateways, local servers).
pub struct OpenAiBackend {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiBackend {
    /// Create a new backend from configuration.
    pub fn new(config: &BackendConfig) -> RepriseResult<Self> {
        let http_client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| RepriseError::backend(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.resolve_api_key(),
        })
    }

    fn build_body(request: &ComposedRequest) -> Value {
        let mut body = json!({
            "model": request.model_name,
            "messages": wire_messages(&request.messages),
        });

        if !request.tools.is_empty() {
            body["tools"] = json!(wire_tools(&request.tools));
        }

        let settings = &request.settings;
        if let Some(temperature) = settings.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = settings.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(top_p) = settings.top_p {
            body["top_p"] = json!(top_p);
        }
        if let Some(stop) = &settings.stop {
            body["stop"] = json!(stop);
        }
        for (key, value) in &settings.extra {
            if !RESERVED_KEYS.contains(&key.as_str()) {
                body[key] = value.clone();
            }
        }

        body
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    #[instrument(skip(self, request), fields(model = %request.model_name))]
    async fn call(&self, request: &ComposedRequest, timeout: Duration) -> RepriseResult<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::build_body(request);

        let mut http_request = self
            .http_client
            .post(&url)
            .timeout(timeout)
            .json(&body);
        if let Some(api_key) = &self.api_key {
            http_request = http_request.bearer_auth(api_key);
        }

        let response = http_request
            .send()
            .await
            .map_err(|e| RepriseError::backend(format!("chat request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(RepriseError::backend(format!(
                "chat API error (status {}): {}",
                status, error_text
            )));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| RepriseError::backend(format!("failed to parse chat response: {}", e)))?;

        let text = render_response(&response_json);
        debug!(chars = text.len(), "chat completion received");
        Ok(text)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

fn wire_messages(messages: &[TranscriptMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            let mut wire = json!({
                "role": message.role.to_string(),
                "content": message.content,
            });
            if let Some(calls) = &message.tool_calls {
                wire["tool_calls"] = json!(calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": wire_arguments(&call.arguments),
                            }
                        })
                    })
                    .collect::<Vec<_>>());
            }
            if message.role == MessageRole::Tool {
                if let Some(id) = &message.tool_call_id {
                    wire["tool_call_id"] = json!(id);
                }
                if let Some(name) = &message.name {
                    wire["name"] = json!(name);
                }
            }
            wire
        })
        .collect()
}

/// The wire format wants tool arguments as a JSON string; captures that
/// already hold a string pass through untouched.
fn wire_arguments(arguments: &Value) -> String {
    match arguments {
        Value::String(s) => s.clone(),
        Value::Null => String::from("{}"),
        other => other.to_string(),
    }
}

fn wire_tools(tools: &[ToolDefinition]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                    "strict": tool.strict,
                }
            })
        })
        .collect()
}

/// Flatten the first choice into display text.
///
/// Replayed turns may answer with text, tool calls, or both; tool calls are
/// rendered into a readable block so the outcome is always a single string.
fn render_response(response: &Value) -> String {
    let message = &response["choices"][0]["message"];
    let content = message["content"].as_str().unwrap_or_default();

    let mut rendered = content.to_string();
    if let Some(calls) = message["tool_calls"].as_array() {
        if !calls.is_empty() {
            if !rendered.is_empty() {
                rendered.push_str("\n\n");
            }
            rendered.push_str("=== Tool Calls ===\n");
            for (i, call) in calls.iter().enumerate() {
                let function = &call["function"];
                rendered.push_str(&format!("Tool Call {}:\n", i + 1));
                rendered.push_str(&format!(
                    "  Name: {}\n",
                    function["name"].as_str().unwrap_or_default()
                ));
                rendered.push_str(&format!(
                    "  ID: {}\n",
                    call["id"].as_str().unwrap_or_default()
                ));
                rendered.push_str(&format!(
                    "  Arguments: {}\n",
                    pretty_arguments(&function["arguments"])
                ));
                if i + 1 < calls.len() {
                    rendered.push('\n');
                }
            }
        }
    }

    if rendered.is_empty() {
        rendered = String::from("[No response content or tool calls]");
    }
    rendered
}

fn pretty_arguments(arguments: &Value) -> String {
    let parsed = match arguments {
        Value::String(s) => serde_json::from_str::<Value>(s).unwrap_or(Value::String(s.clone())),
        other => other.clone(),
    };
    serde_json::to_string_pretty(&parsed).unwrap_or_else(|_| parsed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::settings::ModelSettings;
    use crate::transcript::message::ToolCall;

    fn request() -> ComposedRequest {
        let settings: ModelSettings = serde_json::from_value(json!({
            "temperature": 0.2,
            "seed": 7
        }))
        .unwrap();
        ComposedRequest {
            model_name: "gpt-4o".to_string(),
            messages: vec![
                TranscriptMessage::system("sys"),
                TranscriptMessage::assistant_with_tools(
                    "",
                    vec![ToolCall::new("call_1", "lookup", json!("{\"q\":\"x\"}"))],
                ),
                TranscriptMessage::tool("42", "call_1", Some("lookup")),
                TranscriptMessage::user("Hi"),
            ],
            settings,
            tools: vec![ToolDefinition::new("lookup", "find things", json!({"type": "object"}))],
        }
    }

    #[test]
    fn test_build_body_shape() {
        let body = OpenAiBackend::build_body(&request());
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["temperature"], json!(0.2));
        assert_eq!(body["seed"], json!(7));
        assert_eq!(body["messages"].as_array().unwrap().len(), 4);
        assert_eq!(body["tools"][0]["function"]["name"], "lookup");
    }

    #[test]
    fn test_extra_settings_cannot_shadow_reserved_keys() {
        let mut req = request();
        req.settings.extra.insert("model".into(), json!("evil"));
        let body = OpenAiBackend::build_body(&req);
        assert_eq!(body["model"], "gpt-4o");
    }

    #[test]
    fn test_wire_tool_call_arguments_stay_strings() {
        let body = OpenAiBackend::build_body(&request());
        let call = &body["messages"][1]["tool_calls"][0];
        assert_eq!(call["function"]["arguments"], json!("{\"q\":\"x\"}"));
        assert_eq!(body["messages"][2]["tool_call_id"], "call_1");
    }

    #[test]
    fn test_render_response_with_text_only() {
        let response = json!({
            "choices": [{"message": {"content": "plain answer"}}]
        });
        assert_eq!(render_response(&response), "plain answer");
    }

    #[test]
    fn test_render_response_with_tool_calls() {
        let response = json!({
            "choices": [{"message": {
                "content": "thinking",
                "tool_calls": [{
                    "id": "call_9",
                    "function": {"name": "lookup", "arguments": "{\"q\": 1}"}
                }]
            }}]
        });
        let rendered = render_response(&response);
        assert!(rendered.starts_with("thinking"));
        assert!(rendered.contains("=== Tool Calls ==="));
        assert!(rendered.contains("Name: lookup"));
        assert!(rendered.contains("ID: call_9"));
    }

    #[test]
    fn test_render_empty_response() {
        let response = json!({"choices": [{"message": {"content": ""}}]});
        assert_eq!(render_response(&response), "[No response content or tool calls]");
    }
}
