//! Captured transcript model and import
//!
//! A captured transcript is the immutable record of one previously observed
//! agent call: the ordered message list, the model that served it, its
//! settings, and the tools that were offered. Replay never mutates it.

pub mod import;
pub mod message;
#[allow(clippy::module_inception)]
pub mod transcript;

pub use import::{parse_captured, validate_captured_format};
pub use message::{MessageRole, ToolCall, ToolDefinition, TranscriptMessage};
pub use transcript::CapturedTranscript;
