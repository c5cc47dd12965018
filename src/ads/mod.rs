// Advertising Module
// Persistent banner surface lifecycle plus interstitial/rewarded gating

pub mod appopen;
pub mod banner;
pub mod health;
pub mod interstitial;
pub mod prefs;
pub mod retry;
pub mod rewarded;
pub mod scheduler;
pub mod sim;
pub mod surface;

use std::sync::Arc;
use thiserror::Error;

/// Errors produced while driving the ad surface lifecycle.
///
/// None of these ever propagate to a calling screen; the banner manager
/// absorbs every failure into a scheduled retry or a hidden container.
#[derive(Debug, Clone, Error)]
pub enum AdError {
    /// The ad SDK has not finished initializing yet.
    #[error("ad SDK is not ready")]
    ReadinessNotMet,

    /// The ad network reported a load failure for a surface.
    #[error("ad load failed: {0}")]
    LoadFailure(String),

    /// The factory failed while constructing a surface. Routed through
    /// the same retry path as a load failure.
    #[error("ad surface construction failed: {0}")]
    Construction(String),
}

/// A displayable ad resource obtained from the serving collaborator.
/// The manager treats it as opaque apart from its visibility flag.
pub trait AdSurface: Send + Sync {
    fn set_visible(&self, visible: bool);
    fn is_visible(&self) -> bool;
}

/// Shared reference to one ad surface instance.
pub type SurfaceRef = Arc<dyn AdSurface>;

/// A UI slot capable of hosting at most one ad surface at a time.
/// Containers are owned by the UI layer; the manager only ever holds
/// weak references to them.
pub trait Container: Send + Sync {
    fn add_child(&self, surface: &SurfaceRef);
    fn remove_child(&self, surface: &SurfaceRef);
    fn set_visible(&self, visible: bool);
    fn is_attached(&self) -> bool;
}

/// Whether the ad-serving SDK has completed initialization.
pub trait AdReadiness: Send + Sync {
    fn is_ready(&self) -> bool;
}

/// Completion callback registered with a load request.
pub type LoadCallback = Box<dyn FnOnce(Result<(), AdError>) + Send>;

/// Creates, loads, and destroys ad surfaces.
pub trait AdSurfaceFactory: Send + Sync {
    fn create_surface(&self, placement_id: &str) -> Result<SurfaceRef, AdError>;
    fn request_load(&self, surface: &SurfaceRef, on_result: LoadCallback);
    fn destroy_surface(&self, surface: &SurfaceRef);
}

/// Events delivered back into the banner manager's serialized event loop.
/// Timer firings and load results both arrive this way, so no core state
/// is ever mutated from more than one context.
#[derive(Debug)]
pub enum AdEvent {
    /// A deferred `attach` should run again (readiness was not met).
    RetryAttach,

    /// The surface creation path should run again after a load failure.
    RetryLoad,

    /// The health monitor's recurring check is due.
    HealthTick,

    /// The serving collaborator finished a load request.
    LoadResult {
        handle_id: u64,
        result: Result<(), AdError>,
    },
}

/// Commands accepted by the banner manager, from screens and timers alike.
pub enum ManagerCommand {
    Attach(Arc<dyn Container>),
    Detach,
    Shutdown,
    Event(AdEvent),
}
