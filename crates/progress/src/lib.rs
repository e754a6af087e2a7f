//! Progress Tracking
//!
//! An in-process store of named steps with live completion statistics and
//! a bounded-backpressure subscriber fanout.
//!
//! ```no_run
//! # async fn run() -> steptrack_progress::Result<()> {
//! use steptrack_progress::Progress;
//!
//! let prog = Progress::new();
//! let mut events = prog.subscribe().await;
//! prog.add_step("fetch").await?.set_description("fetch sources").await;
//! prog.add_step("build").await?;
//!
//! prog.must_get("fetch").await.start().await?;
//! println!("{:.0}%", prog.progress().await * 100.0);
//!
//! prog.must_get("fetch").await.done().await?;
//! prog.must_get("build").await.done().await?;
//! while let Some(step) = events.recv().await {
//!     println!("{} {}", step.id, step.state);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod aggregate;
mod broadcast;
pub mod estimator;
mod record;
mod step;
mod store;
pub mod tracker;

pub use broadcast::Subscriber;
pub use estimator::CompletionEstimator;
pub use step::Step;
pub use store::Progress;
pub use tracker::ProgressTracker;

pub use steptrack_core::{
    ProgressConfig, ProgressError, ProgressView, Result, Snapshot, State, StepView, Time,
};
