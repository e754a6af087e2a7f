//! Aggregated statistics and the serializable store rendering.

use crate::step::StepView;
use crate::{State, Time};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub(crate) fn is_zero(value: &usize) -> bool {
    *value == 0
}

pub(crate) fn is_zero_f64(value: &f64) -> bool {
    *value == 0.0
}

/// Info and stats about a store at a given time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Overall state
    pub state: State,

    /// Titles of in-progress steps, joined with ", "
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doing: String,

    /// Steps not started yet
    #[serde(default, skip_serializing_if = "is_zero")]
    pub not_started: usize,

    /// Steps in progress
    #[serde(default, skip_serializing_if = "is_zero")]
    pub in_progress: usize,

    /// Steps done
    #[serde(default, skip_serializing_if = "is_zero")]
    pub completed: usize,

    /// Total number of steps
    #[serde(default, skip_serializing_if = "is_zero")]
    pub total: usize,

    /// Overall completion in `[0.0, 1.0]`
    #[serde(default, skip_serializing_if = "is_zero_f64")]
    pub progress: f64,

    /// Time spent since the first step started (or until the last one ended)
    #[serde(
        default,
        with = "crate::duration::nanos",
        skip_serializing_if = "Duration::is_zero"
    )]
    pub total_duration: Duration,

    /// Mean duration of completed steps
    #[serde(
        default,
        with = "crate::duration::nanos",
        skip_serializing_if = "Duration::is_zero"
    )]
    pub step_duration: Duration,

    /// Estimated remaining time
    #[serde(
        default,
        with = "crate::duration::nanos",
        skip_serializing_if = "Duration::is_zero"
    )]
    pub completion_estimate: Duration,

    /// Most recent step completion, only set when the whole store is done
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_at: Option<Time>,

    /// Oldest step start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Time>,
}

/// Serializable rendering of a whole store.
///
/// The snapshot is computed when the view is built, never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressView {
    /// Steps in insertion order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepView>,

    /// Store creation time
    pub created_at: Time,

    /// Aggregated stats
    pub snapshot: Snapshot,
}
