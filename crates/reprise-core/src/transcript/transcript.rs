//! The captured transcript record

use crate::backend::settings::ModelSettings;
use crate::transcript::message::{MessageRole, ToolDefinition, TranscriptMessage};
use serde::{Deserialize, Serialize};

/// Immutable record of one previously observed agent call.
///
/// Holds the full ordered message list plus the model name, settings, and
/// tool definitions from the captured request. The replay composer reads it
/// through the accessors below; nothing in the engine writes to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedTranscript {
    /// Ordered messages exactly as captured
    pub messages: Vec<TranscriptMessage>,
    /// Model that served the captured call
    pub model_name: String,
    /// Model settings from the captured request
    #[serde(default)]
    pub model_settings: ModelSettings,
    /// Tools offered in the captured request
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
}

impl CapturedTranscript {
    /// Create a transcript from its parts
    pub fn new(
        messages: Vec<TranscriptMessage>,
        model_name: impl Into<String>,
        model_settings: ModelSettings,
        tools: Vec<ToolDefinition>,
    ) -> Self {
        Self {
            messages,
            model_name: model_name.into(),
            model_settings,
            tools,
        }
    }

    /// Index of the first system message, if any
    fn system_index(&self) -> Option<usize> {
        self.messages.iter().position(|m| m.role == MessageRole::System)
    }

    /// Index of the last user message, if any
    fn last_user_index(&self) -> Option<usize> {
        self.messages.iter().rposition(|m| m.role == MessageRole::User)
    }

    /// Content of the first system message, if any
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_index().map(|i| self.messages[i].content.as_str())
    }

    /// Content of the last user message, if any
    pub fn last_user_message(&self) -> Option<&str> {
        self.last_user_index().map(|i| self.messages[i].content.as_str())
    }

    /// All messages except the first system message and the last user
    /// message, in their original order.
    pub fn middle_messages(&self) -> Vec<TranscriptMessage> {
        let system = self.system_index();
        let last_user = self.last_user_index();
        self.messages
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != system && Some(*i) != last_user)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Number of messages in the transcript
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript holds no messages
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CapturedTranscript {
        CapturedTranscript::new(
            vec![
                TranscriptMessage::system("You are helpful"),
                TranscriptMessage::user("first question"),
                TranscriptMessage::assistant("first answer"),
                TranscriptMessage::user("Hi"),
            ],
            "gpt-4o",
            ModelSettings::default(),
            Vec::new(),
        )
    }

    #[test]
    fn test_system_and_last_user() {
        let t = sample();
        assert_eq!(t.system_prompt(), Some("You are helpful"));
        assert_eq!(t.last_user_message(), Some("Hi"));
    }

    #[test]
    fn test_middle_messages_excludes_system_and_final_user() {
        let t = sample();
        let middle = t.middle_messages();
        assert_eq!(middle.len(), 2);
        assert_eq!(middle[0].content, "first question");
        assert_eq!(middle[1].content, "first answer");
    }

    #[test]
    fn test_no_system_message() {
        let t = CapturedTranscript::new(
            vec![
                TranscriptMessage::assistant("ack"),
                TranscriptMessage::user("Hi"),
            ],
            "gpt-4o",
            ModelSettings::default(),
            Vec::new(),
        );
        assert_eq!(t.system_prompt(), None);
        assert_eq!(t.middle_messages().len(), 1);
    }

    #[test]
    fn test_only_first_system_is_special() {
        // A second system message stays in the middle slice untouched.
        let t = CapturedTranscript::new(
            vec![
                TranscriptMessage::system("primary"),
                TranscriptMessage::system("secondary"),
                TranscriptMessage::user("Hi"),
            ],
            "gpt-4o",
            ModelSettings::default(),
            Vec::new(),
        );
        assert_eq!(t.system_prompt(), Some("primary"));
        let middle = t.middle_messages();
        assert_eq!(middle.len(), 1);
        assert_eq!(middle[0].content, "secondary");
    }
}
