// Delayed task scheduling for the banner manager
// Single-shot timers that post events back into the manager's queue

use super::{AdEvent, ManagerCommand};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::trace;

/// Identifies one outstanding scheduled task. Cancelling an already-fired
/// or unknown id is a no-op.
pub type TaskId = u64;

/// Single-shot delayed task scheduler.
///
/// Every armed task yields a `TaskId` cancellation token. Recurring work
/// (the health monitor) is expressed by rearming a fresh task after each
/// firing, so at any moment each client owns at most one pending id.
pub trait TaskScheduler: Send {
    fn schedule(&mut self, delay: Duration, event: AdEvent) -> TaskId;
    fn cancel(&mut self, task: TaskId);
}

/// Production scheduler backed by the tokio timer wheel.
///
/// Each task sleeps on a spawned tokio task and then posts its event into
/// the manager's command queue, so firings are serialized with every other
/// manager operation. Cancellation aborts the sleeping task before it can
/// post.
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<ManagerCommand>,
    next_id: TaskId,
    tasks: HashMap<TaskId, tokio::task::JoinHandle<()>>,
}

impl TokioScheduler {
    pub fn new(tx: mpsc::UnboundedSender<ManagerCommand>) -> Self {
        Self {
            tx,
            next_id: 0,
            tasks: HashMap::new(),
        }
    }
}

impl TaskScheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration, event: AdEvent) -> TaskId {
        // Drop bookkeeping for tasks that already fired.
        self.tasks.retain(|_, handle| !handle.is_finished());

        let id = self.next_id;
        self.next_id += 1;

        trace!(task_id = id, delay_ms = delay.as_millis() as u64, "arming delayed task");

        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The receiver is gone once the manager loop has exited after
            // shutdown; a failed send is exactly the no-op we want then.
            let _ = tx.send(ManagerCommand::Event(event));
        });

        self.tasks.insert(id, handle);
        id
    }

    fn cancel(&mut self, task: TaskId) {
        if let Some(handle) = self.tasks.remove(&task) {
            trace!(task_id = task, "cancelling delayed task");
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ads::AdEvent;

    #[tokio::test]
    async fn scheduled_task_posts_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TokioScheduler::new(tx);

        scheduler.schedule(Duration::from_millis(5), AdEvent::HealthTick);

        let cmd = rx.recv().await.expect("event should arrive");
        assert!(matches!(cmd, ManagerCommand::Event(AdEvent::HealthTick)));
    }

    #[tokio::test]
    async fn cancelled_task_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TokioScheduler::new(tx);

        let id = scheduler.schedule(Duration::from_millis(20), AdEvent::RetryLoad);
        scheduler.cancel(id);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn cancel_unknown_id_is_noop() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = TokioScheduler::new(tx);
        scheduler.cancel(42);
    }
}
