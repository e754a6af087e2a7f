//! Step handle and its state machine.

use crate::record::StepRecord;
use crate::store::{Ledger, Shared};
use crate::Progress;
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use steptrack_core::{ProgressError, Result, State, StepView, Time};
use tokio::sync::RwLockWriteGuard;
use tracing::{debug, warn};

/// Progress value meaning "finished".
const DONE_PROGRESS: f64 = 1.0;

/// Progress value meaning "nothing happened yet".
const NOT_STARTED_PROGRESS: f64 = 0.0;

/// Handle to one step of a store.
///
/// Handles are cheap to clone and always reflect the live step. Every
/// mutation goes through the owning store's lock and is broadcast to the
/// store's subscribers.
#[derive(Clone)]
pub struct Step {
    id: String,
    index: usize,
    shared: Arc<Shared>,
}

impl Step {
    pub(crate) fn new(id: String, index: usize, shared: Arc<Shared>) -> Self {
        Self { id, index, shared }
    }

    /// Step identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The store this step belongs to.
    pub fn store(&self) -> Progress {
        Progress {
            shared: self.shared.clone(),
        }
    }

    async fn read<R>(&self, f: impl FnOnce(&StepRecord) -> R) -> R {
        let ledger = self.shared.ledger.read().await;
        f(&ledger.steps[self.index])
    }

    async fn write(&self) -> RwLockWriteGuard<'_, Ledger> {
        self.shared.ledger.write().await
    }

    // === Mutations ===

    /// Mark the step as started.
    ///
    /// Fails if the step is already in progress or done.
    pub async fn start(&self) -> Result<&Self> {
        let mut ledger = self.write().await;
        let now = Utc::now();
        let step = &mut ledger.steps[self.index];
        self.ensure_startable(step)?;

        step.state = State::InProgress;
        step.started_at.get_or_insert(now);
        step.progress = self.shared.config.start_progress;
        debug!(step = %self.id, "Step started");

        ledger.publish(self.index).await;
        Ok(self)
    }

    /// Set the step completion rate, a value between 0.0 and 1.0.
    ///
    /// `1.0` marks the step done, `0.0` puts it back to not started and any
    /// other value marks it in progress. Fails if the step is already done.
    pub async fn set_progress(&self, progress: f64) -> Result<&Self> {
        if progress == DONE_PROGRESS {
            return self.done().await;
        }

        let mut ledger = self.write().await;
        let now = Utc::now();
        let step = &mut ledger.steps[self.index];
        if step.state == State::Done {
            return Err(ProgressError::AlreadyDone(self.id.clone()));
        }

        step.progress = progress;
        if progress == NOT_STARTED_PROGRESS {
            step.state = State::NotStarted;
        } else {
            step.state = State::InProgress;
            step.started_at.get_or_insert(now);
        }
        debug!(step = %self.id, progress, "Step progress updated");

        ledger.publish(self.index).await;
        Ok(self)
    }

    /// Make this the only in-progress step of the store.
    ///
    /// Every other in-progress step is marked done, then this one is
    /// started, all under a single lock acquisition. Fails like
    /// [`Step::start`].
    pub async fn set_as_current(&self) -> Result<&Self> {
        let mut ledger = self.write().await;
        let now = Utc::now();
        self.ensure_startable(&ledger.steps[self.index])?;

        let running: Vec<usize> = ledger
            .steps
            .iter()
            .enumerate()
            .filter(|(index, step)| *index != self.index && step.state == State::InProgress)
            .map(|(index, _)| index)
            .collect();
        for index in running {
            let step = &mut ledger.steps[index];
            step.state = State::Done;
            step.done_at = Some(now);
            debug!(step = %step.id, "Step done, superseded by {}", self.id);
            ledger.publish(index).await;
        }

        let step = &mut ledger.steps[self.index];
        step.state = State::InProgress;
        step.started_at.get_or_insert(now);
        step.progress = self.shared.config.start_progress;
        debug!(step = %self.id, "Step set as current");

        ledger.publish(self.index).await;
        Ok(self)
    }

    /// Mark the step as done, starting it first if needed.
    ///
    /// Fails if the step is already done. When this completes every step of
    /// the store, all subscribers are closed.
    pub async fn done(&self) -> Result<&Self> {
        let mut ledger = self.write().await;
        let now = Utc::now();
        let step = &mut ledger.steps[self.index];
        if step.state == State::Done {
            return Err(ProgressError::AlreadyDone(self.id.clone()));
        }

        step.state = State::Done;
        step.started_at.get_or_insert(now);
        step.done_at = Some(now);
        debug!(step = %self.id, "Step done");

        ledger.publish(self.index).await;
        ledger.close_if_done();
        Ok(self)
    }

    /// Set a human label.
    pub async fn set_description(&self, description: impl Into<String>) -> &Self {
        let mut ledger = self.write().await;
        ledger.steps[self.index].description = description.into();
        ledger.publish(self.index).await;
        self
    }

    /// Attach an opaque payload, emitted verbatim when rendering.
    ///
    /// `null` clears the payload.
    pub async fn set_data(&self, data: impl Into<serde_json::Value>) -> &Self {
        let mut ledger = self.write().await;
        let data = data.into();
        ledger.steps[self.index].data = (!data.is_null()).then_some(data);
        ledger.publish(self.index).await;
        self
    }

    /// Attach any serializable value as payload.
    pub async fn set_data_from<T: Serialize + ?Sized>(&self, data: &T) -> Result<&Self> {
        let value = serde_json::to_value(data)?;
        Ok(self.set_data(value).await)
    }

    /// Attach (or detach, with `None`) a nested store.
    ///
    /// The child keeps its own lock and subscribers; its events are not
    /// forwarded to this store's subscribers.
    pub async fn set_child(&self, child: impl Into<Option<Progress>>) -> &Self {
        let child = child.into();
        if let Some(child) = &child {
            if Arc::ptr_eq(&child.shared, &self.shared) {
                warn!(step = %self.id, "Ignoring a store attached as its own child");
                return self;
            }
        }

        let mut ledger = self.write().await;
        ledger.steps[self.index].child = child;
        ledger.publish(self.index).await;
        self
    }

    fn ensure_startable(&self, step: &StepRecord) -> Result<()> {
        match step.state {
            State::NotStarted => Ok(()),
            State::InProgress => Err(ProgressError::AlreadyStarted(self.id.clone())),
            State::Done => Err(ProgressError::AlreadyDone(self.id.clone())),
        }
    }

    // === Reads ===

    /// Current state.
    pub async fn state(&self) -> State {
        self.read(|step| step.state).await
    }

    /// Current description (may be empty).
    pub async fn description(&self) -> String {
        self.read(|step| step.description.clone()).await
    }

    /// Display title: the description, or the id when none is set.
    pub async fn title(&self) -> String {
        self.read(|step| step.title().to_string()).await
    }

    /// Attached payload.
    pub async fn data(&self) -> Option<serde_json::Value> {
        self.read(|step| step.data.clone()).await
    }

    /// Own completion rate.
    pub async fn progress(&self) -> f64 {
        self.read(|step| step.progress).await
    }

    /// When the step left `NotStarted`.
    pub async fn started_at(&self) -> Option<Time> {
        self.read(|step| step.started_at).await
    }

    /// When the step was marked done.
    pub async fn done_at(&self) -> Option<Time> {
        self.read(|step| step.done_at).await
    }

    /// Attached child store.
    pub async fn child(&self) -> Option<Progress> {
        self.read(|step| step.child.clone()).await
    }

    /// Elapsed time: zero before start, running time while in progress,
    /// `done_at - started_at` once done.
    pub async fn duration(&self) -> Duration {
        self.read(|step| step.duration(Utc::now())).await
    }

    /// Value copy of the step, with the child store rendered.
    pub async fn view(&self) -> StepView {
        let (mut view, child) = self
            .read(|step| (step.to_view(Utc::now()), step.child.clone()))
            .await;
        if let Some(child) = child {
            let own_store = self.store().address();
            if child.address() != own_store {
                view.child = Some(Box::new(child.view_within(vec![own_store]).await));
            }
        }
        view
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}
