//! Replay overrides and their layering

use crate::backend::settings::ModelSettings;
use crate::transcript::message::ToolDefinition;
use serde::{Deserialize, Serialize};

/// Optional replacements applied when a transcript is replayed.
///
/// Every field is independent: an unset field falls through to the captured
/// value. Overrides never mutate the transcript they are applied to.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReplayOverrides {
    /// Replacement model name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    /// Replacement system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Replacement final user message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    /// Replacement model settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_settings: Option<ModelSettings>,
    /// Replacement tool list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
}

impl ReplayOverrides {
    /// Overrides that change nothing
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the model name override
    pub fn with_model_name<S: Into<String>>(mut self, model_name: S) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    /// Set the system prompt override
    pub fn with_system_prompt<S: Into<String>>(mut self, system_prompt: S) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Set the final user message override
    pub fn with_user_message<S: Into<String>>(mut self, user_message: S) -> Self {
        self.user_message = Some(user_message.into());
        self
    }

    /// Set the model settings override
    pub fn with_model_settings(mut self, settings: ModelSettings) -> Self {
        self.model_settings = Some(settings);
        self
    }

    /// Set the tool list override
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Layer caller overrides on top of a set of defaults, field by field.
    ///
    /// The caller's value wins wherever it is set (empty strings count as
    /// unset); otherwise the default carries through.
    pub fn layered(defaults: &ReplayOverrides, overrides: &ReplayOverrides) -> ReplayOverrides {
        ReplayOverrides {
            model_name: pick_text(&overrides.model_name, &defaults.model_name),
            system_prompt: pick_text(&overrides.system_prompt, &defaults.system_prompt),
            user_message: pick_text(&overrides.user_message, &defaults.user_message),
            model_settings: overrides
                .model_settings
                .clone()
                .or_else(|| defaults.model_settings.clone()),
            tools: overrides.tools.clone().or_else(|| defaults.tools.clone()),
        }
    }
}

fn pick_text(preferred: &Option<String>, fallback: &Option<String>) -> Option<String> {
    preferred
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(String::from)
        .or_else(|| fallback.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layered_caller_wins_field_by_field() {
        let defaults = ReplayOverrides::none()
            .with_model_name("gpt-4o")
            .with_system_prompt("default prompt");
        let overrides = ReplayOverrides::none().with_system_prompt("caller prompt");

        let resolved = ReplayOverrides::layered(&defaults, &overrides);
        assert_eq!(resolved.model_name.as_deref(), Some("gpt-4o"));
        assert_eq!(resolved.system_prompt.as_deref(), Some("caller prompt"));
        assert!(resolved.user_message.is_none());
    }

    #[test]
    fn test_layered_empty_string_falls_through() {
        let defaults = ReplayOverrides::none().with_system_prompt("default prompt");
        let overrides = ReplayOverrides::none().with_system_prompt("");

        let resolved = ReplayOverrides::layered(&defaults, &overrides);
        assert_eq!(resolved.system_prompt.as_deref(), Some("default prompt"));
    }

    #[test]
    fn test_layered_settings_taken_whole() {
        let defaults = ReplayOverrides::none()
            .with_model_settings(ModelSettings::with_temperature(0.1));
        let overrides = ReplayOverrides::none()
            .with_model_settings(ModelSettings::with_temperature(0.9));

        let resolved = ReplayOverrides::layered(&defaults, &overrides);
        assert_eq!(
            resolved.model_settings.unwrap().temperature,
            Some(0.9),
        );
    }
}
