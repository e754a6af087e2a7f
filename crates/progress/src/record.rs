//! Live step state, owned by the store ledger.

use crate::Progress;
use std::time::Duration;
use steptrack_core::{duration, State, StepView, Time};

pub(crate) struct StepRecord {
    pub(crate) id: String,
    pub(crate) description: String,
    pub(crate) started_at: Option<Time>,
    pub(crate) done_at: Option<Time>,
    pub(crate) state: State,
    pub(crate) data: Option<serde_json::Value>,
    pub(crate) progress: f64,
    pub(crate) child: Option<Progress>,
}

impl StepRecord {
    pub(crate) fn new(id: String) -> Self {
        Self {
            id,
            description: String::new(),
            started_at: None,
            done_at: None,
            state: State::NotStarted,
            data: None,
            progress: 0.0,
            child: None,
        }
    }

    pub(crate) fn title(&self) -> &str {
        if self.description.is_empty() {
            &self.id
        } else {
            &self.description
        }
    }

    pub(crate) fn duration(&self, now: Time) -> Duration {
        match (self.state, self.started_at, self.done_at) {
            (State::InProgress, Some(started), _) => duration::between(started, now),
            (State::Done, Some(started), Some(done)) => duration::between(started, done),
            _ => Duration::ZERO,
        }
    }

    /// Value copy without the child rendering.
    pub(crate) fn to_view(&self, now: Time) -> StepView {
        StepView {
            id: self.id.clone(),
            description: self.description.clone(),
            started_at: self.started_at,
            done_at: self.done_at,
            state: self.state,
            data: self.data.clone(),
            progress: self.progress,
            child: None,
            duration: self.duration(now),
        }
    }
}
