//! Message sequence composition for replay

use crate::backend::settings::ModelSettings;
use crate::replay::overrides::ReplayOverrides;
use crate::transcript::message::{ToolDefinition, TranscriptMessage};
use crate::transcript::transcript::CapturedTranscript;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Composition precondition violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    /// Neither the transcript nor the overrides supply a final user message
    #[error("no user message available from transcript or overrides")]
    MissingUserMessage,
}

impl From<ComposeError> for crate::error::RepriseError {
    fn from(error: ComposeError) -> Self {
        Self::InvalidInput(error.to_string())
    }
}

/// A message sequence ready for the model backend.
///
/// Invariant: at most one system message, and only in first position; the
/// last message is always user-role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedRequest {
    /// Effective model name
    pub model_name: String,
    /// Ordered messages to send
    pub messages: Vec<TranscriptMessage>,
    /// Effective model settings
    pub settings: ModelSettings,
    /// Effective tool list
    pub tools: Vec<ToolDefinition>,
}

impl ComposedRequest {
    /// Content of the leading system message, if one was composed
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages.first().and_then(|m| {
            (m.role == crate::transcript::message::MessageRole::System)
                .then_some(m.content.as_str())
        })
    }

    /// Content of the final user message
    pub fn user_message(&self) -> &str {
        self.messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

/// Compose the replay message sequence for a transcript under a set of
/// overrides.
///
/// Concatenation order is fixed: system prompt (override, else captured, else
/// none), then every middle message untouched and in captured order, then the
/// final user message (override, else captured). The transform is pure and
/// deterministic; the missing-user-message precondition is the only way it
/// can fail.
pub fn compose(
    transcript: &CapturedTranscript,
    overrides: &ReplayOverrides,
) -> Result<ComposedRequest, ComposeError> {
    let system_prompt = overrides
        .system_prompt
        .as_deref()
        .filter(|s| !s.is_empty())
        .or_else(|| transcript.system_prompt())
        .filter(|s| !s.is_empty());

    let user_message = overrides
        .user_message
        .as_deref()
        .filter(|s| !s.is_empty())
        .or_else(|| transcript.last_user_message())
        .filter(|s| !s.is_empty())
        .ok_or(ComposeError::MissingUserMessage)?;

    let middle = transcript.middle_messages();
    let mut messages = Vec::with_capacity(middle.len() + 2);
    if let Some(prompt) = system_prompt {
        messages.push(TranscriptMessage::system(prompt));
    }
    messages.extend(middle);
    messages.push(TranscriptMessage::user(user_message));

    let model_name = overrides
        .model_name
        .as_deref()
        .filter(|m| !m.is_empty())
        .unwrap_or(&transcript.model_name)
        .to_string();

    let settings = overrides
        .model_settings
        .clone()
        .unwrap_or_else(|| transcript.model_settings.clone());

    let tools = overrides
        .tools
        .clone()
        .unwrap_or_else(|| transcript.tools.clone());

    Ok(ComposedRequest {
        model_name,
        messages,
        settings,
        tools,
    })
}
