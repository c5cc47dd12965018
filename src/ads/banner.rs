// Banner Ad Manager
// The orchestrating owner of the one persistent banner surface:
// creation, rebinding across containers, retry with backoff, and
// periodic self-healing, all serialized through a single event loop

use super::health::HealthMonitor;
use super::prefs::{now_ms, PrefsStore};
use super::retry::{BackoffPolicy, RetryScheduler};
use super::scheduler::{TaskScheduler, TokioScheduler};
use super::surface::{AdSurfaceHandle, ContainerBinding, SurfaceState};
use super::{AdError, AdEvent, AdReadiness, AdSurfaceFactory, Container, ManagerCommand};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{debug, info, warn};

/// Banner manager configuration
#[derive(Debug, Clone)]
pub struct BannerConfig {
    /// Ad slot requested from the serving collaborator
    pub placement_id: String,

    /// Retry backoff for readiness deferrals and load failures
    pub backoff: BackoffPolicy,

    /// Interval between surface health checks
    pub health_interval: Duration,
}

impl Default for BannerConfig {
    fn default() -> Self {
        Self {
            placement_id: "banner-main".to_string(),
            backoff: BackoffPolicy::default(),
            health_interval: Duration::from_secs(5),
        }
    }
}

/// Snapshot of the manager's internal state, for status output and tests.
#[derive(Debug, Clone)]
pub struct BannerStats {
    pub surface_state: Option<SurfaceState>,
    pub retry_attempts: u32,
    pub retry_pending: bool,
    pub monitoring: bool,
    pub shut_down: bool,
}

/// Lifecycle manager for the single process-wide banner surface.
///
/// Owns exactly one `AdSurfaceHandle`, its container binding, the retry
/// scheduler, and the health monitor. All mutation happens on one logical
/// context: screens and timers alike post `ManagerCommand`s into an mpsc
/// queue drained by `run`, so no locks guard the core state. In tests the
/// manager is driven synchronously through `dispatch` instead.
pub struct BannerAdManager {
    config: BannerConfig,
    readiness: Arc<dyn AdReadiness>,
    factory: Arc<dyn AdSurfaceFactory>,
    scheduler: Box<dyn TaskScheduler>,
    events: mpsc::UnboundedSender<ManagerCommand>,

    handle: Option<AdSurfaceHandle>,
    binding: ContainerBinding,
    retry: RetryScheduler,
    health: HealthMonitor,

    /// Container targeted by the most recent attach; used by deferred
    /// attaches and the recreation path. Weak so a dismantled screen is
    /// never kept alive.
    target: Option<Weak<dyn Container>>,

    /// When set, the banner is suppressed while the store reports an
    /// active ad-free window.
    ad_free: Option<Arc<PrefsStore>>,

    next_handle_id: u64,
    shut_down: bool,
}

/// Cloneable front handle screens use to talk to a spawned manager.
#[derive(Clone)]
pub struct BannerHandle {
    tx: mpsc::UnboundedSender<ManagerCommand>,
}

impl BannerHandle {
    pub fn attach(&self, container: Arc<dyn Container>) {
        let _ = self.tx.send(ManagerCommand::Attach(container));
    }

    pub fn detach(&self) {
        let _ = self.tx.send(ManagerCommand::Detach);
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(ManagerCommand::Shutdown);
    }
}

impl BannerAdManager {
    pub fn new(
        config: BannerConfig,
        readiness: Arc<dyn AdReadiness>,
        factory: Arc<dyn AdSurfaceFactory>,
        scheduler: Box<dyn TaskScheduler>,
        events: mpsc::UnboundedSender<ManagerCommand>,
    ) -> Self {
        let retry = RetryScheduler::new(config.backoff.clone());
        let health = HealthMonitor::new(config.health_interval);
        Self {
            config,
            readiness,
            factory,
            scheduler,
            events,
            handle: None,
            binding: ContainerBinding::default(),
            retry,
            health,
            target: None,
            ad_free: None,
            next_handle_id: 0,
            shut_down: false,
        }
    }

    /// Suppress the banner during ad-free windows granted by rewarded
    /// videos.
    pub fn set_ad_free_prefs(&mut self, prefs: Arc<PrefsStore>) {
        self.ad_free = Some(prefs);
    }

    /// Spawn the manager onto the tokio runtime and return the screen-facing
    /// handle plus the join handle of the event loop.
    pub fn spawn(
        config: BannerConfig,
        readiness: Arc<dyn AdReadiness>,
        factory: Arc<dyn AdSurfaceFactory>,
    ) -> (BannerHandle, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Box::new(TokioScheduler::new(tx.clone()));
        let manager = Self::new(config, readiness, factory, scheduler, tx.clone());
        let join = tokio::spawn(manager.run(rx));
        (BannerHandle { tx }, join)
    }

    /// `spawn` with the preference store wired in so the banner honors
    /// ad-free windows.
    pub fn spawn_with_prefs(
        config: BannerConfig,
        readiness: Arc<dyn AdReadiness>,
        factory: Arc<dyn AdSurfaceFactory>,
        prefs: Arc<PrefsStore>,
    ) -> (BannerHandle, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Box::new(TokioScheduler::new(tx.clone()));
        let mut manager = Self::new(config, readiness, factory, scheduler, tx.clone());
        manager.set_ad_free_prefs(prefs);
        let join = tokio::spawn(manager.run(rx));
        (BannerHandle { tx }, join)
    }

    /// Drain the command queue until shutdown completes.
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<ManagerCommand>) {
        info!(placement = %self.config.placement_id, "banner ad manager running");
        while let Some(cmd) = rx.recv().await {
            let stop = matches!(cmd, ManagerCommand::Shutdown);
            self.dispatch(cmd);
            if stop {
                break;
            }
        }
        info!("banner ad manager stopped");
    }

    /// Process one command. The only entry point that mutates state.
    pub fn dispatch(&mut self, cmd: ManagerCommand) {
        match cmd {
            ManagerCommand::Attach(container) => self.attach(&container),
            ManagerCommand::Detach => self.detach(),
            ManagerCommand::Shutdown => self.shutdown(),
            ManagerCommand::Event(event) => self.handle_event(event),
        }
    }

    /// Host the banner surface in `container`.
    ///
    /// Idempotent and safe to call on every screen resume. A healthy
    /// surface is moved, never reloaded; a missing or failed one is
    /// recreated and bound immediately so the slot is occupied before the
    /// load completes.
    pub fn attach(&mut self, container: &Arc<dyn Container>) {
        if self.shut_down {
            warn!("attach after shutdown ignored");
            return;
        }

        self.target = Some(Arc::downgrade(container));

        if self.in_ad_free_window() {
            debug!("ad-free window active, banner suppressed");
            self.hide_container();
            return;
        }

        if !self.readiness.is_ready() {
            debug!("ad SDK not ready, deferring attach");
            if !self.retry.schedule(self.scheduler.as_mut(), AdEvent::RetryAttach) {
                self.hide_container();
            }
            return;
        }

        match self.handle.as_ref().map(AdSurfaceHandle::state) {
            Some(SurfaceState::Loaded) | Some(SurfaceState::Loading) => self.rebind(container),
            _ => {
                // An explicit attach is a fresh user navigation: the
                // previous failure streak does not carry over.
                self.retry.cancel_pending(self.scheduler.as_mut());
                self.retry.reset();
                self.create_surface();
            }
        }
    }

    /// Unbind the current container without destroying the surface. The
    /// handle stays alive for reuse by the next attach; monitoring pauses
    /// until the surface is hosted again.
    pub fn detach(&mut self) {
        if self.shut_down {
            return;
        }
        debug!("detaching banner container");
        match self.handle.as_ref() {
            Some(handle) => self.binding.unbind(handle.surface()),
            None => self.binding.clear(),
        }
        self.health.stop(self.scheduler.as_mut());
        self.target = None;
    }

    /// Terminal teardown. Cancels every pending task before releasing the
    /// handle so no stale timer can resurrect destroyed state. Calling it
    /// again is a no-op.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            debug!("shutdown already complete");
            return;
        }
        info!("shutting down banner ad manager");

        self.retry.cancel_pending(self.scheduler.as_mut());
        self.health.stop(self.scheduler.as_mut());

        if let Some(mut handle) = self.handle.take() {
            self.binding.unbind(handle.surface());
            self.factory.destroy_surface(handle.surface());
            handle.set_state(SurfaceState::Destroyed);
        } else {
            self.binding.clear();
        }

        self.retry.reset();
        self.target = None;
        self.shut_down = true;
    }

    /// Handle a timer firing or load result.
    pub fn handle_event(&mut self, event: AdEvent) {
        if self.shut_down {
            debug!("event after shutdown dropped");
            return;
        }
        match event {
            AdEvent::RetryAttach => {
                self.retry.task_fired();
                if let Some(container) = self.live_target() {
                    self.attach(&container);
                } else {
                    debug!("deferred attach target gone");
                }
            }
            AdEvent::RetryLoad => {
                self.retry.task_fired();
                self.create_surface();
            }
            AdEvent::HealthTick => self.on_health_tick(),
            AdEvent::LoadResult { handle_id, result } => self.on_load_result(handle_id, result),
        }
    }

    pub fn stats(&self) -> BannerStats {
        BannerStats {
            surface_state: self.handle.as_ref().map(AdSurfaceHandle::state),
            retry_attempts: self.retry.attempt_count(),
            retry_pending: self.retry.has_pending(),
            monitoring: self.health.is_monitoring(),
            shut_down: self.shut_down,
        }
    }

    fn live_target(&self) -> Option<Arc<dyn Container>> {
        self.target.as_ref().and_then(Weak::upgrade)
    }

    /// Move the existing surface into a new container without reloading.
    fn rebind(&mut self, container: &Arc<dyn Container>) {
        let Some(handle) = self.handle.as_ref() else {
            return;
        };
        debug!(handle_id = handle.id(), container_bound = self.binding.is_bound(), "rebinding surface");
        self.binding.bind(container, handle);
        if handle.state() == SurfaceState::Loaded && !self.health.is_monitoring() {
            self.health.start(self.scheduler.as_mut());
        }
    }

    /// Creation path: discard any dead handle, build a fresh surface,
    /// bind it to the target container immediately, and issue the load.
    fn create_surface(&mut self) {
        if self.in_ad_free_window() {
            debug!("ad-free window active, banner load skipped");
            self.hide_container();
            return;
        }

        let Some(container) = self.live_target() else {
            debug!("no live container, surface creation skipped");
            return;
        };

        if let Some(old) = self.handle.take() {
            self.binding.unbind(old.surface());
            self.factory.destroy_surface(old.surface());
        }

        let id = self.next_handle_id;
        self.next_handle_id += 1;

        let surface = match self.factory.create_surface(&self.config.placement_id) {
            Ok(surface) => surface,
            Err(e) => {
                // Construction failures take the load-failure retry path.
                warn!(error = %e, "surface construction failed");
                self.schedule_load_retry();
                return;
            }
        };

        let mut handle = AdSurfaceHandle::new(id, self.config.placement_id.clone(), surface);
        handle.set_state(SurfaceState::Loading);

        // Bind before the load completes so the slot is occupied right
        // away; a brief empty surface beats a delayed pop-in.
        self.binding.bind(&container, &handle);

        let events = self.events.clone();
        self.factory.request_load(
            handle.surface(),
            Box::new(move |result| {
                let _ = events.send(ManagerCommand::Event(AdEvent::LoadResult {
                    handle_id: id,
                    result,
                }));
            }),
        );

        info!(handle_id = id, placement = %self.config.placement_id, "banner load requested");
        self.handle = Some(handle);
    }

    fn on_load_result(&mut self, handle_id: u64, result: Result<(), AdError>) {
        let current = self
            .handle
            .as_ref()
            .map(|h| h.id() == handle_id)
            .unwrap_or(false);
        if !current {
            debug!(handle_id, "load result for discarded handle dropped");
            return;
        }

        match result {
            Ok(()) => {
                if let Some(handle) = self.handle.as_mut() {
                    handle.mark_loaded();
                }
                info!(handle_id, "banner loaded");
                self.retry.cancel_pending(self.scheduler.as_mut());
                self.retry.reset();

                if let Some(container) = self.binding.container() {
                    container.set_visible(true);
                    if let Some(handle) = self.handle.as_ref() {
                        handle.surface().set_visible(true);
                    }
                    self.health.start(self.scheduler.as_mut());
                } else {
                    // Loaded while detached: keep the surface for the next
                    // attach, nothing to watch until then.
                    debug!(handle_id, "banner loaded while unbound");
                }
            }
            Err(e) => {
                warn!(handle_id, error = %e, "banner load failed");
                if let Some(handle) = self.handle.as_mut() {
                    handle.set_state(SurfaceState::Failed);
                }
                self.health.stop(self.scheduler.as_mut());
                self.schedule_load_retry();
            }
        }
    }

    /// Periodic verification of the loaded surface. Missing handle or
    /// dead container is fatal: discard and recreate with a fresh attempt
    /// count. Visibility or tree-attachment drift is repaired in place.
    fn on_health_tick(&mut self) {
        self.health.tick_fired();
        if !self.health.is_monitoring() {
            return;
        }

        let healthy = match (self.binding.container(), self.handle.as_ref()) {
            (Some(container), Some(handle))
                if handle.state() == SurfaceState::Loaded
                    && self.binding.bound_handle() == Some(handle.id()) =>
            {
                Some((container, handle.surface().clone()))
            }
            _ => None,
        };

        let Some((container, surface)) = healthy else {
            warn!("health check: surface or container lost, recreating");
            self.health.stop(self.scheduler.as_mut());
            match self.handle.take() {
                Some(old) => {
                    self.binding.unbind(old.surface());
                    self.factory.destroy_surface(old.surface());
                }
                None => self.binding.clear(),
            }
            self.retry.cancel_pending(self.scheduler.as_mut());
            // A corrupted handle is a fresh failure class, distinct from a
            // load failure streak.
            self.retry.reset();
            self.create_surface();
            return;
        };

        if !container.is_attached() {
            warn!("health check: container detached from UI tree, forcing visibility");
            container.set_visible(true);
        }
        if !surface.is_visible() {
            debug!("health check: surface hidden, restoring visibility");
            surface.set_visible(true);
        }

        self.health.rearm(self.scheduler.as_mut());
    }

    fn schedule_load_retry(&mut self) {
        if !self.retry.schedule(self.scheduler.as_mut(), AdEvent::RetryLoad) {
            warn!(
                attempts = self.retry.attempt_count(),
                "no further banner retries, hiding container"
            );
            self.hide_container();
        }
    }

    fn in_ad_free_window(&self) -> bool {
        self.ad_free
            .as_ref()
            .is_some_and(|prefs| prefs.is_ad_free(now_ms()))
    }

    fn hide_container(&mut self) {
        if let Some(container) = self.binding.container().or_else(|| self.live_target()) {
            container.set_visible(false);
        }
    }
}
