// Periodic health verification for the live banner surface
// Recurring check expressed as a rearmed single-shot task

use super::scheduler::{TaskId, TaskScheduler};
use super::AdEvent;
use tokio::time::Duration;
use tracing::debug;

/// Drives the fixed-interval liveness check of the loaded surface.
///
/// Monitoring starts only after a Loaded transition and stops on detach,
/// shutdown, or a fatal check result. Each tick is a single-shot task;
/// the manager rearms the next one after handling a tick, so at most one
/// tick task is ever pending and a cancelled monitor can never fire again.
pub struct HealthMonitor {
    interval: Duration,
    monitoring: bool,
    pending: Option<TaskId>,
}

impl HealthMonitor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            monitoring: false,
            pending: None,
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Begin monitoring, cancelling any tick left over from a previous run.
    pub fn start(&mut self, scheduler: &mut dyn TaskScheduler) {
        self.cancel(scheduler);
        debug!(interval_ms = self.interval.as_millis() as u64, "health monitoring started");
        self.monitoring = true;
        self.pending = Some(scheduler.schedule(self.interval, AdEvent::HealthTick));
    }

    /// Record that the pending tick has fired.
    pub fn tick_fired(&mut self) {
        self.pending = None;
    }

    /// Arm the next tick. No-op when monitoring has been stopped in the
    /// meantime.
    pub fn rearm(&mut self, scheduler: &mut dyn TaskScheduler) {
        if self.monitoring && self.pending.is_none() {
            self.pending = Some(scheduler.schedule(self.interval, AdEvent::HealthTick));
        }
    }

    pub fn stop(&mut self, scheduler: &mut dyn TaskScheduler) {
        if self.monitoring {
            debug!("health monitoring stopped");
        }
        self.cancel(scheduler);
        self.monitoring = false;
    }

    fn cancel(&mut self, scheduler: &mut dyn TaskScheduler) {
        if let Some(id) = self.pending.take() {
            scheduler.cancel(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingScheduler {
        next: TaskId,
        pending: Vec<TaskId>,
    }

    impl CountingScheduler {
        fn new() -> Self {
            Self {
                next: 0,
                pending: Vec::new(),
            }
        }
    }

    impl TaskScheduler for CountingScheduler {
        fn schedule(&mut self, _delay: Duration, _event: AdEvent) -> TaskId {
            let id = self.next;
            self.next += 1;
            self.pending.push(id);
            id
        }

        fn cancel(&mut self, task: TaskId) {
            self.pending.retain(|id| *id != task);
        }
    }

    #[test]
    fn start_arms_exactly_one_tick() {
        let mut sched = CountingScheduler::new();
        let mut monitor = HealthMonitor::new(Duration::from_secs(5));

        monitor.start(&mut sched);
        monitor.start(&mut sched);

        assert!(monitor.is_monitoring());
        assert_eq!(sched.pending.len(), 1);
    }

    #[test]
    fn stop_cancels_pending_tick() {
        let mut sched = CountingScheduler::new();
        let mut monitor = HealthMonitor::new(Duration::from_secs(5));

        monitor.start(&mut sched);
        monitor.stop(&mut sched);

        assert!(!monitor.is_monitoring());
        assert!(sched.pending.is_empty());
        assert!(!monitor.has_pending());
    }

    #[test]
    fn rearm_after_stop_is_noop() {
        let mut sched = CountingScheduler::new();
        let mut monitor = HealthMonitor::new(Duration::from_secs(5));

        monitor.start(&mut sched);
        monitor.tick_fired();
        monitor.stop(&mut sched);
        monitor.rearm(&mut sched);

        assert!(sched.pending.is_empty());
    }

    #[test]
    fn tick_then_rearm_keeps_single_task() {
        let mut sched = CountingScheduler::new();
        let mut monitor = HealthMonitor::new(Duration::from_secs(5));

        monitor.start(&mut sched);
        monitor.tick_fired();
        monitor.rearm(&mut sched);

        assert_eq!(sched.pending.len(), 1);
    }
}
