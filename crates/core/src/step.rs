//! Value copy of a step.

use crate::snapshot::{is_zero_f64, ProgressView};
use crate::{State, Time};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A point-in-time copy of one step.
///
/// This is what subscribers receive and what a store renders under `steps`.
/// It never aliases the live step: later mutations do not show up here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepView {
    /// Unique identifier within the owning store
    pub id: String,

    /// Human label
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// When the step left `NotStarted`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Time>,

    /// When the step reached `Done`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_at: Option<Time>,

    /// Lifecycle state
    pub state: State,

    /// Opaque caller payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Fractional completion, meaningful while in progress
    #[serde(default, skip_serializing_if = "is_zero_f64")]
    pub progress: f64,

    /// Rendering of an attached child store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child: Option<Box<ProgressView>>,

    /// Elapsed time at the moment the copy was taken
    #[serde(
        default,
        with = "crate::duration::nanos",
        skip_serializing_if = "Duration::is_zero"
    )]
    pub duration: Duration,
}

impl StepView {
    /// Display title: the description, or the id when no description is set.
    pub fn title(&self) -> &str {
        if self.description.is_empty() {
            &self.id
        } else {
            &self.description
        }
    }
}
