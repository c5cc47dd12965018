// Simulated ad collaborators
// In-process stand-ins for the ad SDK, used by the browse command and tests

use super::scheduler::{TaskId, TaskScheduler};
use super::{
    AdError, AdEvent, AdReadiness, AdSurface, AdSurfaceFactory, Container, LoadCallback, SurfaceRef,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::debug;

/// Deterministic scheduler that parks tasks until the driver fires them.
///
/// Lets tests and simulations step timers by hand: inspect what is armed,
/// then feed the fired event back into the manager themselves.
pub struct ManualScheduler {
    next: TaskId,
    armed: Arc<Mutex<Vec<(TaskId, Duration, AdEvent)>>>,
}

impl ManualScheduler {
    pub fn new() -> (Self, Arc<Mutex<Vec<(TaskId, Duration, AdEvent)>>>) {
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

impl TaskScheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration, event: AdEvent) -> TaskId {
        let id = self.next;
        self.next += 1;
        self.armed.lock().push((id, delay, event));
        id
    }

    fn cancel(&mut self, task: TaskId) {
        self.armed.lock().retain(|(id, _, _)| *id != task);
    }
}

/// Shared call journal so tests can assert cross-container ordering.
pub type CallJournal = Arc<Mutex<Vec<String>>>;

/// Readiness source that reports not-ready for the first `not_ready_polls`
/// queries and ready afterwards.
pub struct SimReadiness {
    polls: AtomicU32,
    not_ready_polls: u32,
    forced_ready: AtomicBool,
}

impl SimReadiness {
    pub fn ready() -> Self {
        Self::ready_after(0)
    }

    pub fn ready_after(not_ready_polls: u32) -> Self {
        Self {
            polls: AtomicU32::new(0),
            not_ready_polls,
            forced_ready: AtomicBool::new(false),
        }
    }

    /// Flip to ready immediately, regardless of poll count.
    pub fn set_ready(&self) {
        self.forced_ready.store(true, Ordering::Relaxed);
    }
}

impl AdReadiness for SimReadiness {
    fn is_ready(&self) -> bool {
        if self.forced_ready.load(Ordering::Relaxed) {
            return true;
        }
        self.polls.fetch_add(1, Ordering::Relaxed) >= self.not_ready_polls
    }
}

/// Minimal surface: just a visibility flag.
pub struct SimSurface {
    visible: AtomicBool,
}

impl SimSurface {
    pub fn new() -> Self {
        Self {
            visible: AtomicBool::new(false),
        }
    }
}

impl Default for SimSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl AdSurface for SimSurface {
    fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Relaxed);
    }

    fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }
}

/// Simulated UI slot. Tracks its children by pointer identity and records
/// every mutation into the optional shared journal.
pub struct SimContainer {
    name: String,
    children: Mutex<Vec<SurfaceRef>>,
    visible: AtomicBool,
    attached: AtomicBool,
    journal: Option<CallJournal>,
}

impl SimContainer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Mutex::new(Vec::new()),
            visible: AtomicBool::new(true),
            attached: AtomicBool::new(true),
            journal: None,
        }
    }

    pub fn with_journal(name: impl Into<String>, journal: CallJournal) -> Self {
        let mut container = Self::new(name);
        container.journal = Some(journal);
        container
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn child_count(&self) -> usize {
        self.children.lock().len()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }

    /// Simulate the UI layer detaching this slot from the tree.
    pub fn set_attached(&self, attached: bool) {
        self.attached.store(attached, Ordering::Relaxed);
    }

    fn record(&self, call: &str) {
        if let Some(journal) = &self.journal {
            journal.lock().push(format!("{}:{}", self.name, call));
        }
    }
}

impl Container for SimContainer {
    fn add_child(&self, surface: &SurfaceRef) {
        debug!(container = %self.name, "add_child");
        self.record("add_child");
        self.children.lock().push(surface.clone());
    }

    fn remove_child(&self, surface: &SurfaceRef) {
        debug!(container = %self.name, "remove_child");
        self.record("remove_child");
        self.children
            .lock()
            .retain(|child| !Arc::ptr_eq(child, surface));
    }

    fn set_visible(&self, visible: bool) {
        self.record(if visible { "set_visible:true" } else { "set_visible:false" });
        self.visible.store(visible, Ordering::Relaxed);
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Relaxed)
    }
}

/// How the simulated factory answers load requests.
enum LoadMode {
    /// Resolve every load successfully right away.
    AutoSucceed,

    /// Fail the first `n` loads, then succeed.
    FailFirst(AtomicU32),

    /// Park callbacks until the driver fires them explicitly.
    Manual,
}

/// Simulated surface factory with counters for created/destroyed surfaces.
pub struct SimFactory {
    mode: LoadMode,
    fail_creations: AtomicU32,
    created: AtomicUsize,
    destroyed: AtomicUsize,
    parked: Mutex<Vec<LoadCallback>>,
}

impl SimFactory {
    pub fn auto_succeed() -> Self {
        Self::with_mode(LoadMode::AutoSucceed)
    }

    pub fn fail_first(failures: u32) -> Self {
        Self::with_mode(LoadMode::FailFirst(AtomicU32::new(failures)))
    }

    pub fn manual() -> Self {
        Self::with_mode(LoadMode::Manual)
    }

    /// Make the next `n` `create_surface` calls return a construction
    /// error before any load is attempted.
    pub fn fail_next_creations(&self, n: u32) {
        self.fail_creations.store(n, Ordering::Relaxed);
    }

    fn with_mode(mode: LoadMode) -> Self {
        Self {
            mode,
            fail_creations: AtomicU32::new(0),
            created: AtomicUsize::new(0),
            destroyed: AtomicUsize::new(0),
            parked: Mutex::new(Vec::new()),
        }
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    pub fn destroyed_count(&self) -> usize {
        self.destroyed.load(Ordering::Relaxed)
    }

    pub fn parked_count(&self) -> usize {
        self.parked.lock().len()
    }

    /// Resolve the oldest parked load request (manual mode). Returns
    /// false when nothing was parked.
    pub fn resolve_next(&self, result: Result<(), AdError>) -> bool {
        let callback = {
            let mut parked = self.parked.lock();
            if parked.is_empty() {
                return false;
            }
            parked.remove(0)
        };
        callback(result);
        true
    }
}

impl AdSurfaceFactory for SimFactory {
    fn create_surface(&self, placement_id: &str) -> Result<SurfaceRef, AdError> {
        let failing = self
            .fail_creations
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(1))
            })
            .unwrap_or(0)
            > 0;
        if failing {
            return Err(AdError::Construction("simulated SDK error".to_string()));
        }
        debug!(placement = placement_id, "simulated surface created");
        self.created.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(SimSurface::new()))
    }

    fn request_load(&self, _surface: &SurfaceRef, on_result: LoadCallback) {
        match &self.mode {
            LoadMode::AutoSucceed => on_result(Ok(())),
            LoadMode::FailFirst(remaining) => {
                let prev = remaining
                    .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                        Some(n.saturating_sub(1))
                    })
                    .unwrap_or(0);
                if prev > 0 {
                    on_result(Err(AdError::LoadFailure("simulated no-fill".to_string())));
                } else {
                    on_result(Ok(()));
                }
            }
            LoadMode::Manual => self.parked.lock().push(on_result),
        }
    }

    fn destroy_surface(&self, _surface: &SurfaceRef) {
        debug!("simulated surface destroyed");
        self.destroyed.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_flips_after_polls() {
        let readiness = SimReadiness::ready_after(2);
        assert!(!readiness.is_ready());
        assert!(!readiness.is_ready());
        assert!(readiness.is_ready());
    }

    #[test]
    fn fail_first_mode_recovers() {
        let factory = SimFactory::fail_first(1);
        let surface = factory.create_surface("banner-main").unwrap();

        let outcome = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..2 {
            let outcome = outcome.clone();
            factory.request_load(
                &surface,
                Box::new(move |result| outcome.lock().push(result.is_ok())),
            );
        }
        assert_eq!(*outcome.lock(), vec![false, true]);
    }

    #[test]
    fn manual_mode_parks_callbacks() {
        let factory = SimFactory::manual();
        let surface = factory.create_surface("banner-main").unwrap();

        factory.request_load(&surface, Box::new(|_| {}));
        assert_eq!(factory.parked_count(), 1);
        assert!(factory.resolve_next(Ok(())));
        assert!(!factory.resolve_next(Ok(())));
    }
}
