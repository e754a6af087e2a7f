//! Completion time estimation.

use chrono::Duration as ChronoDuration;
use std::time::Duration;
use steptrack_core::{Snapshot, State, Time};

/// Completion time estimator.
///
/// Works on the flat equal-share model: every step weighs the same, so the
/// remaining time is extrapolated linearly from the elapsed time.
pub struct CompletionEstimator;

impl CompletionEstimator {
    /// Mean of the given step durations, zero when there are none.
    pub fn mean_step_duration<I>(&self, durations: I) -> Duration
    where
        I: IntoIterator<Item = Duration>,
    {
        let (sum, count) = durations
            .into_iter()
            .fold((Duration::ZERO, 0u32), |(sum, count), d| {
                (sum.saturating_add(d), count.saturating_add(1))
            });
        if count == 0 {
            return Duration::ZERO;
        }
        sum / count
    }

    /// Estimate the remaining time of an in-progress snapshot.
    ///
    /// Zero unless the snapshot is in progress with a progress strictly
    /// between 0 and 1.
    pub fn estimate_remaining(&self, snapshot: &Snapshot) -> Duration {
        let progress = snapshot.progress;
        if snapshot.state != State::InProgress || !(progress > 0.0 && progress < 1.0) {
            return Duration::ZERO;
        }

        let remaining = snapshot.total_duration.as_secs_f64() * (1.0 - progress) / progress;
        Duration::try_from_secs_f64(remaining).unwrap_or_default()
    }

    /// Estimate when the store will be done.
    pub fn estimate_done_at(&self, snapshot: &Snapshot, now: Time) -> Option<Time> {
        match snapshot.state {
            State::Done => snapshot.done_at,
            State::NotStarted => None,
            State::InProgress => {
                let remaining = self.estimate_remaining(snapshot);
                if remaining.is_zero() {
                    return None;
                }
                ChronoDuration::from_std(remaining)
                    .ok()
                    .and_then(|d| now.checked_add_signed(d))
            }
        }
    }
}

impl Default for CompletionEstimator {
    fn default() -> Self {
        Self
    }
}
