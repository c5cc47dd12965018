// Ad surface handle and container binding
// One exclusively-owned surface, bound to at most one container at a time

use super::{Container, SurfaceRef};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tracing::debug;

/// Lifecycle states of an ad surface handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    /// Handle created, no load issued yet
    Uninitialized,

    /// A load request is in flight
    Loading,

    /// The surface holds a creative and may be shown
    Loaded,

    /// The last load attempt failed
    Failed,

    /// Terminal state, only reached via shutdown
    Destroyed,
}

impl std::fmt::Display for SurfaceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceState::Uninitialized => write!(f, "INIT"),
            SurfaceState::Loading => write!(f, "LOADING"),
            SurfaceState::Loaded => write!(f, "LOADED"),
            SurfaceState::Failed => write!(f, "FAILED"),
            SurfaceState::Destroyed => write!(f, "DESTROYED"),
        }
    }
}

/// Identity of one ad surface instance, exclusively owned by the banner
/// manager. Never shared or copied; discarded wholesale when a fatal
/// health check or load give-up requires recreation.
pub struct AdSurfaceHandle {
    id: u64,
    placement_id: String,
    state: SurfaceState,
    loaded_at: Option<Instant>,
    surface: SurfaceRef,
}

impl AdSurfaceHandle {
    pub fn new(id: u64, placement_id: String, surface: SurfaceRef) -> Self {
        Self {
            id,
            placement_id,
            state: SurfaceState::Uninitialized,
            loaded_at: None,
            surface,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn placement_id(&self) -> &str {
        &self.placement_id
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn set_state(&mut self, state: SurfaceState) {
        debug!(handle_id = self.id, from = %self.state, to = %state, "surface state transition");
        self.state = state;
    }

    pub fn mark_loaded(&mut self) {
        self.set_state(SurfaceState::Loaded);
        self.loaded_at = Some(Instant::now());
    }

    pub fn loaded_at(&self) -> Option<Instant> {
        self.loaded_at
    }

    pub fn surface(&self) -> &SurfaceRef {
        &self.surface
    }
}

/// Tracks which UI container currently hosts the surface.
///
/// Holds only a weak reference: the container's lifecycle belongs to the
/// UI layer, and the manager must never keep a dismantled screen alive.
/// `bind` always detaches from the previous container first, so the
/// surface is never attached to two containers simultaneously.
#[derive(Default)]
pub struct ContainerBinding {
    container: Option<Weak<dyn Container>>,
    bound_handle: Option<u64>,
}

impl ContainerBinding {
    /// Move the surface into `container`, removing it from any previous
    /// host first and making both container and surface visible.
    pub fn bind(&mut self, container: &Arc<dyn Container>, handle: &AdSurfaceHandle) {
        self.unbind(handle.surface());

        container.add_child(handle.surface());
        container.set_visible(true);
        handle.surface().set_visible(true);

        self.container = Some(Arc::downgrade(container));
        self.bound_handle = Some(handle.id());
    }

    /// Remove the surface from its current host, if that host is still
    /// alive, and forget the binding.
    pub fn unbind(&mut self, surface: &SurfaceRef) {
        if let Some(container) = self.container() {
            container.remove_child(surface);
        }
        self.clear();
    }

    /// Forget the binding without touching the container.
    pub fn clear(&mut self) {
        self.container = None;
        self.bound_handle = None;
    }

    /// The bound container, if one is bound and still alive.
    pub fn container(&self) -> Option<Arc<dyn Container>> {
        self.container.as_ref().and_then(Weak::upgrade)
    }

    pub fn bound_handle(&self) -> Option<u64> {
        self.bound_handle
    }

    pub fn is_bound(&self) -> bool {
        self.bound_handle.is_some()
    }
}
