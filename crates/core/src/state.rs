//! Step lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a step, or the aggregated state of a whole store.
///
/// Transitions only move forward: `NotStarted → InProgress → Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum State {
    /// Step was registered but nothing happened yet
    #[default]
    #[serde(rename = "not started")]
    NotStarted,
    /// Step has begun
    #[serde(rename = "in progress")]
    InProgress,
    /// Step is finished (terminal)
    #[serde(rename = "done")]
    Done,
}

impl State {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            State::NotStarted => "not started",
            State::InProgress => "in progress",
            State::Done => "done",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
