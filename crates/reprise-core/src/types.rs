//! Shared identifier and timestamp types

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Unique identifier for agents, test cases, runs, and logs
pub type Id = Uuid;

/// Generate a fresh identifier
pub fn new_id() -> Id {
    Uuid::new_v4()
}

/// Current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
