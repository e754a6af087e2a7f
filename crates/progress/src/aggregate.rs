//! Snapshot aggregation over a store's steps.

use crate::estimator::CompletionEstimator;
use crate::record::StepRecord;
use steptrack_core::{duration, Snapshot, State, Time};

/// Overall completion rate in `[0.0, 1.0]`.
///
/// Not-started steps count 0, done steps 1 and in-progress steps their own
/// fraction. A store where every step is done reports exactly 1.0.
pub(crate) fn progress(steps: &[StepRecord]) -> f64 {
    if steps.is_empty() {
        return 0.0;
    }

    let mut sum = 0.0;
    let mut all_done = true;
    for step in steps {
        match step.state {
            State::NotStarted => all_done = false,
            State::InProgress => {
                all_done = false;
                sum += step.progress;
            }
            State::Done => sum += 1.0,
        }
    }

    if all_done {
        return 1.0;
    }
    sum / steps.len() as f64
}

/// Whether the store holds at least one step and all of them are done.
pub(crate) fn is_done(steps: &[StepRecord]) -> bool {
    !steps.is_empty() && steps.iter().all(|step| step.state == State::Done)
}

/// Overall state from the per-state counters, `None` if no rule matches.
pub(crate) fn classify(snapshot: &Snapshot) -> Option<State> {
    let done = snapshot.completed > 0 && snapshot.in_progress == 0 && snapshot.not_started == 0;
    let in_progress = snapshot.completed < snapshot.total
        && (snapshot.in_progress > 0 || snapshot.completed > 0);
    let not_started = snapshot.completed == 0 && snapshot.in_progress == 0;

    if done {
        (snapshot.completed == snapshot.total).then_some(State::Done)
    } else if in_progress {
        Some(State::InProgress)
    } else if not_started {
        Some(State::NotStarted)
    } else {
        None
    }
}

/// Compute the snapshot of `steps` as seen at `now`.
///
/// # Panics
///
/// Panics if the counters cannot be classified, which means the store
/// itself is corrupted.
pub(crate) fn snapshot(steps: &[StepRecord], now: Time) -> Snapshot {
    if steps.is_empty() {
        return Snapshot::default();
    }

    let mut snapshot = Snapshot {
        total: steps.len(),
        ..Default::default()
    };

    let mut doing = Vec::new();
    for step in steps {
        match step.state {
            State::NotStarted => snapshot.not_started += 1,
            State::InProgress => {
                snapshot.in_progress += 1;
                doing.push(step.title());
            }
            State::Done => snapshot.completed += 1,
        }

        // oldest start
        if let Some(started_at) = step.started_at {
            if snapshot.started_at.map_or(true, |oldest| started_at < oldest) {
                snapshot.started_at = Some(started_at);
            }
        }

        // most recent completion
        if let Some(done_at) = step.done_at {
            if snapshot.done_at.map_or(true, |latest| done_at > latest) {
                snapshot.done_at = Some(done_at);
            }
        }
    }

    snapshot.doing = doing.join(", ");
    snapshot.progress = progress(steps);

    match classify(&snapshot) {
        Some(State::Done) => {
            snapshot.state = State::Done;
            snapshot.progress = 1.0;
            if let (Some(started_at), Some(done_at)) = (snapshot.started_at, snapshot.done_at) {
                snapshot.total_duration = duration::between(started_at, done_at);
            }
        }
        Some(State::InProgress) => {
            snapshot.state = State::InProgress;
            snapshot.done_at = None;
            if let Some(started_at) = snapshot.started_at {
                snapshot.total_duration = duration::between(started_at, now);
            }
        }
        Some(State::NotStarted) => {
            snapshot.state = State::NotStarted;
            snapshot.done_at = None;
        }
        None => panic!("snapshot has an unclassifiable state: {snapshot:?}"),
    }

    let estimator = CompletionEstimator;
    snapshot.step_duration = estimator.mean_step_duration(
        steps
            .iter()
            .filter(|step| step.state == State::Done)
            .map(|step| step.duration(now)),
    );
    snapshot.completion_estimate = estimator.estimate_remaining(&snapshot);

    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::time::Duration;

    fn record(id: &str, state: State) -> StepRecord {
        let mut step = StepRecord::new(id.to_string());
        step.state = state;
        step
    }

    fn counts(not_started: usize, in_progress: usize, completed: usize) -> Snapshot {
        Snapshot {
            not_started,
            in_progress,
            completed,
            total: not_started + in_progress + completed,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_store() {
        let snapshot = snapshot(&[], Utc::now());
        assert_eq!(snapshot.state, State::NotStarted);
        assert_eq!(snapshot.total, 0);
        assert_eq!(snapshot.progress, 0.0);
        assert_eq!(progress(&[]), 0.0);
        assert!(!is_done(&[]));
    }

    #[test]
    fn test_classify_rules() {
        assert_eq!(classify(&counts(2, 0, 0)), Some(State::NotStarted));
        assert_eq!(classify(&counts(1, 1, 0)), Some(State::InProgress));
        assert_eq!(classify(&counts(1, 0, 1)), Some(State::InProgress));
        assert_eq!(classify(&counts(0, 2, 1)), Some(State::InProgress));
        assert_eq!(classify(&counts(0, 0, 3)), Some(State::Done));
    }

    #[test]
    fn test_classify_rejects_inconsistent_counters() {
        let broken = Snapshot {
            completed: 1,
            total: 2,
            ..Default::default()
        };
        assert_eq!(classify(&broken), None);
    }

    #[test]
    fn test_in_progress_uses_own_fraction() {
        let now = Utc::now();
        let mut running = record("b", State::InProgress);
        running.progress = 0.2;
        running.started_at = Some(now);
        let steps = vec![record("a", State::NotStarted), running];

        let snapshot = snapshot(&steps, now);
        assert_eq!(snapshot.progress, progress(&steps));
        assert!((snapshot.progress - 0.1).abs() < 1e-12);
        assert_eq!(snapshot.doing, "b");
    }

    #[test]
    fn test_done_forces_exact_progress_and_bounds() {
        let start = Utc::now() - ChronoDuration::seconds(10);
        let steps: Vec<StepRecord> = (0..3)
            .map(|i| {
                let mut step = record(&format!("s{i}"), State::Done);
                step.started_at = Some(start + ChronoDuration::seconds(i));
                step.done_at = Some(start + ChronoDuration::seconds(i + 2));
                step
            })
            .collect();

        let snapshot = snapshot(&steps, Utc::now());
        assert_eq!(snapshot.state, State::Done);
        assert_eq!(snapshot.progress, 1.0);
        assert_eq!(progress(&steps), 1.0);
        assert_eq!(snapshot.started_at, Some(start));
        assert_eq!(snapshot.done_at, Some(start + ChronoDuration::seconds(4)));
        assert_eq!(snapshot.total_duration, Duration::from_secs(4));
        assert_eq!(snapshot.step_duration, Duration::from_secs(2));
        assert!(snapshot.completion_estimate.is_zero());
        assert!(is_done(&steps));
    }

    #[test]
    fn test_in_progress_clears_done_at() {
        let now = Utc::now();
        let mut finished = record("a", State::Done);
        finished.started_at = Some(now - ChronoDuration::seconds(4));
        finished.done_at = Some(now - ChronoDuration::seconds(2));
        let steps = vec![finished, record("b", State::NotStarted)];

        let snapshot = snapshot(&steps, now);
        assert_eq!(snapshot.state, State::InProgress);
        assert_eq!(snapshot.done_at, None);
        assert_eq!(snapshot.total_duration, Duration::from_secs(4));
        assert_eq!(snapshot.progress, 0.5);
        assert_eq!(snapshot.completion_estimate, Duration::from_secs(4));
    }
}
