//! Subscriber fanout with bounded backpressure.

use std::time::Duration;
use steptrack_core::StepView;
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tracing::{debug, warn};

/// Receiving end of a store subscription.
///
/// `recv()` yields a copy of every mutated step, in mutation order, and
/// returns `None` once the store is closed or every step is done.
pub type Subscriber = mpsc::Receiver<StepView>;

struct Outlet {
    id: u64,
    tx: mpsc::Sender<StepView>,
}

/// Set of subscriber channels attached to one store.
///
/// Always driven while the store's write lock is held, so every subscriber
/// sees events in the global mutation order.
pub(crate) struct Broadcaster {
    outlets: Vec<Outlet>,
    capacity: usize,
    timeout: Duration,
    next_id: u64,
}

impl Broadcaster {
    pub(crate) fn new(capacity: usize, timeout: Duration) -> Self {
        Self {
            outlets: Vec::new(),
            capacity: capacity.max(1),
            timeout,
            next_id: 0,
        }
    }

    /// Register a new bounded channel.
    pub(crate) fn subscribe(&mut self) -> Subscriber {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = self.next_id;
        self.next_id += 1;
        self.outlets.push(Outlet { id, tx });
        debug!(subscriber = id, "Subscriber registered");
        rx
    }

    /// Number of registered subscribers.
    pub(crate) fn len(&self) -> usize {
        self.outlets.len()
    }

    /// Send a copy of `step` to every subscriber.
    ///
    /// A full channel is waited on for at most the configured timeout, then
    /// the event is dropped for that subscriber only.
    pub(crate) async fn publish(&mut self, step: StepView) {
        if self.outlets.is_empty() {
            return;
        }

        for outlet in &self.outlets {
            match outlet.tx.send_timeout(step.clone(), self.timeout).await {
                Ok(()) => {}
                Err(SendTimeoutError::Timeout(_)) => {
                    warn!(
                        subscriber = outlet.id,
                        step = %step.id,
                        "Subscriber did not drain in {:?}, dropping event",
                        self.timeout
                    );
                }
                Err(SendTimeoutError::Closed(_)) => {
                    debug!(subscriber = outlet.id, "Subscriber receiver dropped");
                }
            }
        }

        self.outlets.retain(|outlet| !outlet.tx.is_closed());
    }

    /// Close and deregister every subscriber. Returns how many were closed.
    pub(crate) fn close(&mut self) -> usize {
        let closed = self.outlets.len();
        // dropping the senders closes the channels
        self.outlets.clear();
        closed
    }
}
