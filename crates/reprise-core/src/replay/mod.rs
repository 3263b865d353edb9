//! Replay composition
//!
//! Turns a captured transcript plus a set of overrides into the exact message
//! sequence to send back to a model. Composition is pure: same transcript and
//! overrides in, identical request out, every time.

pub mod composer;
pub mod overrides;

pub use composer::{compose, ComposeError, ComposedRequest};
pub use overrides::ReplayOverrides;
