//! Read-only progress tracking surface.

use crate::Progress;
use async_trait::async_trait;
use steptrack_core::{ProgressView, Snapshot};

/// Anything that can report its progress.
///
/// Renderers and reporters depend on this rather than on a concrete store.
#[async_trait]
pub trait ProgressTracker: Send + Sync {
    /// Take a progress snapshot.
    async fn snapshot(&self) -> Snapshot;

    /// Current completion rate in `[0.0, 1.0]`.
    async fn progress(&self) -> f64;

    /// Full rendering, snapshot included.
    async fn view(&self) -> ProgressView;
}

#[async_trait]
impl ProgressTracker for Progress {
    async fn snapshot(&self) -> Snapshot {
        Progress::snapshot(self).await
    }

    async fn progress(&self) -> f64 {
        Progress::progress(self).await
    }

    async fn view(&self) -> ProgressView {
        Progress::view(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use steptrack_core::State;

    #[tokio::test]
    async fn test_store_as_tracker() {
        let prog = Progress::new();
        prog.add_step("a").await.unwrap().start().await.unwrap();
        prog.add_step("b").await.unwrap();

        let tracker: Arc<dyn ProgressTracker> = Arc::new(prog.clone());
        let snapshot = tracker.snapshot().await;
        assert_eq!(snapshot.state, State::InProgress);
        assert_eq!(snapshot.progress, tracker.progress().await);
        assert_eq!(tracker.view().await.steps.len(), 2);
    }
}
