// Retry scheduling with capped backoff
// Guarantees at most one pending retry task at any time

use super::scheduler::{TaskId, TaskScheduler};
use super::AdEvent;
use tokio::time::Duration;
use tracing::{debug, warn};

/// Backoff policy for consecutive retry attempts.
///
/// The delay grows linearly with the attempt count and is clamped to
/// `cap` (monotonic ceiling: once the cap is reached the delay stays
/// there, it never resets while the failure streak continues). With the
/// defaults the sequence is 2s, 4s, 6s, 8s, 10s, 10s, ...
///
/// `max_attempts` is the optional give-up ceiling. `None` retries
/// forever, which matches the most aggressive revision of this component
/// but can spin indefinitely against a permanently-unavailable network,
/// so production configs should usually set a cap.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(2),
            cap: Duration::from_secs(10),
            max_attempts: None,
        }
    }
}

impl BackoffPolicy {
    /// Delay before the given attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(attempt.max(1)).min(self.cap)
    }
}

/// Owns the single outstanding retry task for the banner manager.
///
/// Scheduling always cancels any prior pending task first, so there is
/// never more than one retry in flight.
pub struct RetryScheduler {
    policy: BackoffPolicy,
    attempt_count: u32,
    pending: Option<TaskId>,
}

impl RetryScheduler {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            attempt_count: 0,
            pending: None,
        }
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Arm a retry that will deliver `event` after the backoff delay.
    ///
    /// Increments the attempt count first, then computes the delay from
    /// it. Returns `false` when the configured attempt ceiling has been
    /// exceeded and no task was armed.
    pub fn schedule(&mut self, scheduler: &mut dyn TaskScheduler, event: AdEvent) -> bool {
        self.cancel_pending(scheduler);

        self.attempt_count += 1;
        if let Some(max) = self.policy.max_attempts {
            if self.attempt_count > max {
                warn!(
                    attempts = self.attempt_count,
                    max_attempts = max,
                    "retry ceiling exceeded, giving up"
                );
                return false;
            }
        }

        let delay = self.policy.delay_for(self.attempt_count);
        debug!(
            attempt = self.attempt_count,
            delay_ms = delay.as_millis() as u64,
            "retry scheduled"
        );
        self.pending = Some(scheduler.schedule(delay, event));
        true
    }

    /// Record that the pending task has fired and is no longer armed.
    pub fn task_fired(&mut self) {
        self.pending = None;
    }

    pub fn cancel_pending(&mut self, scheduler: &mut dyn TaskScheduler) {
        if let Some(id) = self.pending.take() {
            scheduler.cancel(id);
        }
    }

    /// Reset the failure streak back to zero attempts / base delay.
    pub fn reset(&mut self) {
        self.attempt_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Records armed tasks instead of sleeping.
    struct RecordingScheduler {
        next: TaskId,
        armed: Arc<Mutex<Vec<(TaskId, Duration)>>>,
    }

    impl RecordingScheduler {
        fn new() -> (Self, Arc<Mutex<Vec<(TaskId, Duration)>>>) {
            let armed = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    next: 0,
                    armed: armed.clone(),
                },
                armed,
            )
        }
    }

    impl TaskScheduler for RecordingScheduler {
        fn schedule(&mut self, delay: Duration, _event: AdEvent) -> TaskId {
            let id = self.next;
            self.next += 1;
            self.armed.lock().push((id, delay));
            id
        }

        fn cancel(&mut self, task: TaskId) {
            self.armed.lock().retain(|(id, _)| *id != task);
        }
    }

    #[test]
    fn linear_capped_delay_sequence() {
        let policy = BackoffPolicy::default();
        let delays: Vec<u64> = (1..=7).map(|a| policy.delay_for(a).as_secs()).collect();
        assert_eq!(delays, vec![2, 4, 6, 8, 10, 10, 10]);
    }

    #[test]
    fn at_most_one_pending_task() {
        let (mut sched, armed) = RecordingScheduler::new();
        let mut retry = RetryScheduler::new(BackoffPolicy::default());

        assert!(retry.schedule(&mut sched, AdEvent::RetryLoad));
        assert!(retry.schedule(&mut sched, AdEvent::RetryLoad));
        assert!(retry.schedule(&mut sched, AdEvent::RetryLoad));

        assert_eq!(armed.lock().len(), 1);
        assert_eq!(retry.attempt_count(), 3);
    }

    #[test]
    fn ceiling_stops_scheduling() {
        let (mut sched, armed) = RecordingScheduler::new();
        let mut retry = RetryScheduler::new(BackoffPolicy {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(5),
            max_attempts: Some(2),
        });

        assert!(retry.schedule(&mut sched, AdEvent::RetryLoad));
        retry.task_fired();
        assert!(retry.schedule(&mut sched, AdEvent::RetryLoad));
        retry.task_fired();
        assert!(!retry.schedule(&mut sched, AdEvent::RetryLoad));
        assert!(armed.lock().is_empty());
        assert!(!retry.has_pending());
    }

    #[test]
    fn reset_restarts_the_streak() {
        let (mut sched, armed) = RecordingScheduler::new();
        let mut retry = RetryScheduler::new(BackoffPolicy::default());

        retry.schedule(&mut sched, AdEvent::RetryLoad);
        retry.schedule(&mut sched, AdEvent::RetryLoad);
        retry.reset();
        assert_eq!(retry.attempt_count(), 0);

        retry.schedule(&mut sched, AdEvent::RetryLoad);
        let (_, delay) = *armed.lock().last().expect("task armed");
        assert_eq!(delay, Duration::from_secs(2));
    }
}
