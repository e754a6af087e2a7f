//! The step store.

use crate::aggregate;
use crate::broadcast::{Broadcaster, Subscriber};
use crate::record::StepRecord;
use crate::step::Step;
use chrono::Utc;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use steptrack_core::{ProgressConfig, ProgressError, ProgressView, Result, Snapshot, Time};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub(crate) struct Shared {
    pub(crate) created_at: Time,
    pub(crate) config: ProgressConfig,
    pub(crate) ledger: RwLock<Ledger>,
}

/// Everything guarded by the store lock.
pub(crate) struct Ledger {
    pub(crate) steps: Vec<StepRecord>,
    pub(crate) broadcaster: Broadcaster,
}

impl Ledger {
    fn position(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.id == id)
    }

    /// Fan out a copy of the step at `index`.
    pub(crate) async fn publish(&mut self, index: usize) {
        let view = self.steps[index].to_view(Utc::now());
        debug!(step = %view.id, state = %view.state, "Publishing step");
        self.broadcaster.publish(view).await;
    }

    /// Close every subscriber once all steps are done.
    pub(crate) fn close_if_done(&mut self) {
        if aggregate::is_done(&self.steps) {
            let closed = self.broadcaster.close();
            info!(subscribers = closed, "All steps done, closing subscribers");
        }
    }
}

/// An ordered, id-unique collection of steps with live statistics.
///
/// `Progress` is a cheap handle: clones share the same steps, lock and
/// subscribers. Every mutation holds the store's write lock for its whole
/// duration, fanout included, so subscribers observe mutations in exactly
/// the order they happened.
#[derive(Clone)]
pub struct Progress {
    pub(crate) shared: Arc<Shared>,
}

impl Progress {
    /// Create a new, empty store with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ProgressConfig::default())
    }

    /// Create a new, empty store.
    pub fn with_config(config: ProgressConfig) -> Self {
        let broadcaster = Broadcaster::new(config.subscriber_capacity, config.publish_timeout);
        Self {
            shared: Arc::new(Shared {
                created_at: Utc::now(),
                config,
                ledger: RwLock::new(Ledger {
                    steps: Vec::new(),
                    broadcaster,
                }),
            }),
        }
    }

    /// When the store was created.
    pub fn created_at(&self) -> Time {
        self.shared.created_at
    }

    /// The configuration the store was created with.
    pub fn config(&self) -> &ProgressConfig {
        &self.shared.config
    }

    /// Whether both handles point to the same store.
    pub fn same_store(&self, other: &Progress) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Append a new, not started step and publish it.
    ///
    /// Fails with [`ProgressError::EmptyId`] or
    /// [`ProgressError::DuplicateId`]; the store is left untouched then.
    pub async fn add_step(&self, id: impl Into<String>) -> Result<Step> {
        let id = id.into();
        if id.is_empty() {
            return Err(ProgressError::EmptyId);
        }

        let mut ledger = self.shared.ledger.write().await;
        if ledger.position(&id).is_some() {
            return Err(ProgressError::DuplicateId(id));
        }

        let index = ledger.steps.len();
        ledger.steps.push(StepRecord::new(id.clone()));
        debug!(step = %id, index, "Step added");
        ledger.publish(index).await;

        Ok(Step::new(id, index, self.shared.clone()))
    }

    /// Like [`Progress::add_step`], but treats a bad id as a programming error.
    ///
    /// # Panics
    ///
    /// Panics if `id` is empty or already registered.
    pub async fn must_add_step(&self, id: impl Into<String>) -> Step {
        match self.add_step(id).await {
            Ok(step) => step,
            Err(err) => panic!("{err}"),
        }
    }

    /// Look up a step by id.
    ///
    /// Returns `Ok(None)` when no step matches and
    /// [`ProgressError::EmptyId`] when `id` is empty.
    pub async fn get(&self, id: &str) -> Result<Option<Step>> {
        if id.is_empty() {
            return Err(ProgressError::EmptyId);
        }

        let ledger = self.shared.ledger.read().await;
        Ok(ledger
            .position(id)
            .map(|index| Step::new(id.to_string(), index, self.shared.clone())))
    }

    /// Like [`Progress::get`], but treats a missing step as a programming error.
    ///
    /// # Panics
    ///
    /// Panics if `id` is empty or unknown.
    pub async fn must_get(&self, id: &str) -> Step {
        match self.get(id).await {
            Ok(Some(step)) => step,
            Ok(None) => panic!("no step with id '{id}'"),
            Err(err) => panic!("{err}"),
        }
    }

    /// Handles to every step, in insertion order.
    pub async fn steps(&self) -> Vec<Step> {
        let ledger = self.shared.ledger.read().await;
        ledger
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| Step::new(step.id.clone(), index, self.shared.clone()))
            .collect()
    }

    /// Number of steps.
    pub async fn len(&self) -> usize {
        self.shared.ledger.read().await.steps.len()
    }

    /// Whether the store holds no step.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Register a new subscriber.
    ///
    /// It receives a copy of every step mutated from now on, until the store
    /// is closed or all its steps are done.
    pub async fn subscribe(&self) -> Subscriber {
        self.shared.ledger.write().await.broadcaster.subscribe()
    }

    /// Number of registered subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.shared.ledger.read().await.broadcaster.len()
    }

    /// Close and deregister every subscriber. Safe to call repeatedly.
    pub async fn close(&self) {
        let closed = self.shared.ledger.write().await.broadcaster.close();
        if closed > 0 {
            debug!(subscribers = closed, "Subscribers closed");
        }
    }

    /// Compute the current stats.
    pub async fn snapshot(&self) -> Snapshot {
        let ledger = self.shared.ledger.read().await;
        aggregate::snapshot(&ledger.steps, Utc::now())
    }

    /// Current completion rate in `[0.0, 1.0]`.
    ///
    /// Cheaper than [`Progress::snapshot`] and always equal to its `progress`.
    pub async fn progress(&self) -> f64 {
        let ledger = self.shared.ledger.read().await;
        aggregate::progress(&ledger.steps)
    }

    /// Render the store, its fresh snapshot and every attached child store.
    ///
    /// A child store that is already being rendered higher up (a cycle of
    /// child attachments) is rendered as `child: None`.
    pub fn view(&self) -> Pin<Box<dyn Future<Output = ProgressView> + Send + '_>> {
        self.view_within(Vec::new())
    }

    pub(crate) fn address(&self) -> usize {
        Arc::as_ptr(&self.shared) as usize
    }

    /// Render the store below the stores whose addresses are in `ancestors`.
    pub(crate) fn view_within(
        &self,
        mut ancestors: Vec<usize>,
    ) -> Pin<Box<dyn Future<Output = ProgressView> + Send + '_>> {
        Box::pin(async move {
            ancestors.push(self.address());
            let (mut steps, children, snapshot) = {
                let ledger = self.shared.ledger.read().await;
                let now = Utc::now();
                let steps: Vec<_> = ledger.steps.iter().map(|step| step.to_view(now)).collect();
                let children: Vec<_> = ledger.steps.iter().map(|step| step.child.clone()).collect();
                (steps, children, aggregate::snapshot(&ledger.steps, now))
            };

            // children have their own lock, read them after releasing ours
            for (step, child) in steps.iter_mut().zip(children) {
                let Some(child) = child else { continue };
                if ancestors.contains(&child.address()) {
                    warn!(step = %step.id, "Child store cycle, not rendering the child");
                    continue;
                }
                step.child = Some(Box::new(child.view_within(ancestors.clone()).await));
            }

            ProgressView {
                steps,
                created_at: self.shared.created_at,
                snapshot,
            }
        })
    }

    /// Render the store as indented JSON.
    pub async fn to_json_pretty(&self) -> Result<String> {
        let view = self.view().await;
        Ok(serde_json::to_string_pretty(&view)?)
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("created_at", &self.shared.created_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steptrack_core::State;

    #[tokio::test]
    async fn test_new_store() {
        let prog = Progress::new();
        assert!(prog.is_empty().await);
        assert!(prog.created_at() <= Utc::now());

        let snapshot = prog.snapshot().await;
        assert_eq!(snapshot.state, State::NotStarted);
        assert_eq!(snapshot.total, 0);
        assert_eq!(snapshot.progress, prog.progress().await);
        assert!(prog.get("step1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_step_validation() {
        let prog = Progress::new();
        assert!(matches!(prog.add_step("").await, Err(ProgressError::EmptyId)));

        prog.add_step("step1").await.unwrap();
        match prog.add_step("step1").await {
            Err(ProgressError::DuplicateId(id)) => assert_eq!(id, "step1"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(prog.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_requires_id() {
        let prog = Progress::new();
        assert!(matches!(prog.get("").await, Err(ProgressError::EmptyId)));
    }

    #[tokio::test]
    #[should_panic(expected = "already registered")]
    async fn test_must_add_step_panics_on_duplicate() {
        let prog = Progress::new();
        prog.must_add_step("step1").await;
        prog.must_add_step("step1").await;
    }

    #[tokio::test]
    #[should_panic(expected = "no step with id")]
    async fn test_must_get_panics_on_unknown() {
        Progress::new().must_get("missing").await;
    }

    #[tokio::test]
    async fn test_steps_keep_insertion_order() {
        let prog = Progress::new();
        for id in ["c", "a", "b"] {
            prog.add_step(id).await.unwrap();
        }
        let ids: Vec<String> = prog
            .steps()
            .await
            .iter()
            .map(|step| step.id().to_string())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_handles_share_state() {
        let prog = Progress::new();
        let other = prog.clone();
        prog.add_step("step1").await.unwrap();
        assert!(other.same_store(&prog));
        assert_eq!(other.len().await, 1);
        assert!(!Progress::new().same_store(&prog));
    }

    #[tokio::test]
    async fn test_close_twice_and_subscribe_after_close() {
        let prog = Progress::new();
        prog.close().await;
        prog.close().await;

        let mut rx = prog.subscribe().await;
        assert_eq!(prog.subscriber_count().await, 1);
        prog.add_step("step1").await.unwrap();
        assert_eq!(rx.recv().await.unwrap().id, "step1");

        prog.close().await;
        assert!(rx.recv().await.is_none());
        assert_eq!(prog.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn test_to_json_pretty() {
        let prog = Progress::new();
        prog.add_step("init").await.unwrap().set_description("initialize").await;
        prog.add_step("step1").await.unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&prog.to_json_pretty().await.unwrap()).unwrap();
        assert_eq!(json["steps"][0]["description"], "initialize");
        assert_eq!(json["steps"][1]["state"], "not started");
        assert_eq!(json["snapshot"]["total"], 2);
        assert_eq!(json["snapshot"]["not_started"], 2);
        assert!(json["snapshot"].get("progress").is_none());
        assert!(json.get("created_at").is_some());
    }

    #[tokio::test]
    async fn test_view_breaks_child_cycles() {
        let a = Progress::new();
        let b = Progress::new();
        let on_a = a.add_step("a1").await.unwrap();
        let on_b = b.add_step("b1").await.unwrap();
        on_a.set_child(b.clone()).await;
        on_b.set_child(a.clone()).await;

        let view = tokio::time::timeout(std::time::Duration::from_secs(3), a.view())
            .await
            .unwrap();
        let rendered_b = view.steps[0].child.as_ref().unwrap();
        assert_eq!(rendered_b.steps[0].id, "b1");
        assert!(rendered_b.steps[0].child.is_none());

        let json = a.to_json_pretty().await.unwrap();
        assert!(json.contains("\"b1\""));

        let from_step = on_b.view().await;
        let rendered_a = from_step.child.unwrap();
        assert_eq!(rendered_a.steps[0].id, "a1");
        assert!(rendered_a.steps[0].child.is_none());
    }
}
