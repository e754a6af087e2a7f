//! Steptrack core data models.
//!
//! Plain values shared by the progress store and its consumers: step and
//! store states, value copies handed to subscribers, aggregated snapshots,
//! errors and configuration.

#![warn(missing_docs)]

mod config;
pub mod duration;
mod error;
mod snapshot;
mod state;
mod step;

pub use config::{
    ProgressConfig, DEFAULT_PUBLISH_TIMEOUT, DEFAULT_START_PROGRESS, DEFAULT_SUBSCRIBER_CAPACITY,
};
pub use error::{ProgressError, Result};
pub use snapshot::{ProgressView, Snapshot};
pub use state::State;
pub use step::StepView;

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
