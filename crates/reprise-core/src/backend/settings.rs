//! Model settings carried with a request

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Settings forwarded to the model backend alongside a request.
///
/// The common knobs are typed; anything else from a captured request is kept
/// verbatim in `extra` and forwarded untouched. `serde_json`'s map keeps keys
/// sorted, so serializing the same settings twice yields identical bytes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Nucleus sampling parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// Any other captured settings, forwarded as-is
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ModelSettings {
    /// Settings with only a temperature set
    pub fn with_temperature(temperature: f64) -> Self {
        Self {
            temperature: Some(temperature),
            ..Default::default()
        }
    }

    /// Whether no settings are present at all
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.max_tokens.is_none()
            && self.top_p.is_none()
            && self.stop.is_none()
            && self.extra.is_empty()
    }
}
