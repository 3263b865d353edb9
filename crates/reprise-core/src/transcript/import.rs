//! Import of captured observability exports
//!
//! Captures arrive as the span export of an instrumented agent call: the
//! original chat request body lives under `attributes["http.request.body.text"]`.
//! Parsing splits out the first system message and the last user message so
//! the replay composer can substitute either one, and keeps everything else
//! verbatim.

use crate::backend::settings::ModelSettings;
use crate::error::{RepriseError, RepriseResult};
use crate::transcript::message::{MessageRole, ToolCall, ToolDefinition, TranscriptMessage};
use crate::transcript::transcript::CapturedTranscript;
use serde_json::Value;
use tracing::{debug, warn};

const BODY_KEY: &str = "http.request.body.text";

/// Parse a captured export into a transcript.
///
/// # Errors
///
/// Returns a transcript error when the envelope is missing, the message list
/// is empty, or no model name is present.
pub fn parse_captured(raw: &Value) -> RepriseResult<CapturedTranscript> {
    let body = request_body(raw)?;

    let all_messages = body
        .get("messages")
        .and_then(|v| v.as_array())
        .filter(|m| !m.is_empty())
        .ok_or_else(|| RepriseError::transcript("no messages found in captured request body"))?;

    let model_name = body
        .get("model")
        .and_then(|v| v.as_str())
        .filter(|m| !m.is_empty())
        .map(|m| m.to_string())
        .ok_or_else(|| RepriseError::transcript("no model specified in captured request body"))?;

    let mut messages = Vec::with_capacity(all_messages.len());
    for message in all_messages {
        match parse_message(message) {
            Some(parsed) => messages.push(parsed),
            None => {
                warn!(message = %message, "skipping captured message with unknown role");
            }
        }
    }

    if messages.is_empty() {
        return Err(RepriseError::transcript(
            "captured request body held no usable messages",
        ));
    }

    let tools: Vec<ToolDefinition> = body
        .get("tools")
        .and_then(|v| v.as_array())
        .map(|entries| entries.iter().filter_map(parse_tool).collect())
        .unwrap_or_default();

    let model_settings = parse_settings(body);

    debug!(
        messages = messages.len(),
        model = model_name,
        tools = tools.len(),
        "parsed captured transcript"
    );

    Ok(CapturedTranscript::new(
        messages,
        model_name,
        model_settings,
        tools,
    ))
}

/// Check whether a raw value looks like a parseable captured export.
pub fn validate_captured_format(raw: &Value) -> bool {
    let Ok(body) = request_body(raw) else {
        return false;
    };

    let Some(messages) = body.get("messages").and_then(|v| v.as_array()) else {
        return false;
    };
    if messages.is_empty() {
        return false;
    }

    if body
        .get("model")
        .and_then(|v| v.as_str())
        .map_or(true, |m| m.is_empty())
    {
        return false;
    }

    messages.iter().all(|message| {
        message.get("content").is_some()
            && matches!(
                message.get("role").and_then(|r| r.as_str()),
                Some("system" | "user" | "assistant" | "tool")
            )
    })
}

/// Extract the request body object from the export envelope.
///
/// The body is normally an object; some exporters serialize it as a JSON
/// string, which is accepted and parsed in place.
fn request_body(raw: &Value) -> RepriseResult<Value> {
    let attributes = raw
        .get("attributes")
        .and_then(|v| v.as_object())
        .ok_or_else(|| RepriseError::transcript("missing 'attributes' in captured data"))?;

    let body = attributes
        .get(BODY_KEY)
        .ok_or_else(|| {
            RepriseError::transcript(format!("missing '{}' in captured data", BODY_KEY))
        })?;

    match body {
        Value::Object(_) => Ok(body.clone()),
        Value::String(text) => serde_json::from_str::<Value>(text)
            .ok()
            .filter(|v| v.is_object())
            .ok_or_else(|| {
                RepriseError::transcript("captured request body is not a JSON object")
            }),
        _ => Err(RepriseError::transcript(
            "captured request body is not a JSON object",
        )),
    }
}

fn parse_message(message: &Value) -> Option<TranscriptMessage> {
    let role = message.get("role")?.as_str()?;
    let content = match message.get("content") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    match role {
        "system" => Some(TranscriptMessage::system(content)),
        "user" => Some(TranscriptMessage::user(content)),
        "assistant" => {
            let tool_calls = message
                .get("tool_calls")
                .and_then(|v| v.as_array())
                .map(|calls| calls.iter().filter_map(parse_tool_call).collect::<Vec<_>>())
                .filter(|calls: &Vec<ToolCall>| !calls.is_empty());
            Some(TranscriptMessage {
                role: MessageRole::Assistant,
                content,
                tool_calls,
                tool_call_id: None,
                name: None,
            })
        }
        "tool" => Some(TranscriptMessage {
            role: MessageRole::Tool,
            content,
            tool_call_id: message
                .get("tool_call_id")
                .and_then(|v| v.as_str())
                .map(String::from),
            name: message.get("name").and_then(|v| v.as_str()).map(String::from),
            tool_calls: None,
        }),
        _ => None,
    }
}

fn parse_tool_call(call: &Value) -> Option<ToolCall> {
    let function = call.get("function")?.as_object()?;
    Some(ToolCall {
        id: call
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        name: function.get("name")?.as_str()?.to_string(),
        arguments: function.get("arguments").cloned().unwrap_or(Value::Null),
    })
}

fn parse_tool(tool: &Value) -> Option<ToolDefinition> {
    if tool.get("type").and_then(|v| v.as_str()) != Some("function") {
        return None;
    }
    let function = tool.get("function")?.as_object()?;
    Some(ToolDefinition {
        name: function
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        description: function
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        parameters: function
            .get("parameters")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default())),
        strict: function
            .get("strict")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
    })
}

/// Everything in the request body other than messages, model, and tools is
/// treated as model settings.
fn parse_settings(body: Value) -> ModelSettings {
    let Value::Object(mut map) = body else {
        return ModelSettings::default();
    };
    map.remove("messages");
    map.remove("model");
    map.remove("tools");
    serde_json::from_value(Value::Object(map)).unwrap_or_default()
}
