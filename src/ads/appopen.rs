// App-open ad gating
// A full-screen ad on app foregrounding: shown every few opens, as long
// as the prefetched creative has not gone stale

use super::prefs::PrefsStore;
use anyhow::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// App-open gate configuration
#[derive(Debug, Clone)]
pub struct AppOpenConfig {
    /// Show on every Nth eligible app open
    pub show_every: u32,

    /// Age after which a prefetched ad is discarded as stale
    pub max_ad_age_hours: u64,
}

impl Default for AppOpenConfig {
    fn default() -> Self {
        Self {
            show_every: 2,
            max_ad_age_hours: 4,
        }
    }
}

/// Outcome of gating one app open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppOpenOutcome {
    /// A fresh ad is held and the open count is due, show it now
    Show,

    /// Suppressed by an active ad-free window
    AdFree,

    /// No fresh ad held; a new fetch should start
    NotReady,

    /// Open counted, but the show interval has not come around yet
    Skipped { opens: u32 },
}

impl std::fmt::Display for AppOpenOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppOpenOutcome::Show => write!(f, "show"),
            AppOpenOutcome::AdFree => write!(f, "suppressed (ad-free)"),
            AppOpenOutcome::NotReady => write!(f, "no fresh ad"),
            AppOpenOutcome::Skipped { opens } => write!(f, "skipped (open {opens})"),
        }
    }
}

/// Decides when an app-open ad may be shown.
///
/// The open counter persists in the shared preference store; the load
/// timestamp of the held creative does not, since a prefetched ad never
/// survives a restart. Opens are counted only while a fresh ad is held,
/// so the every-Nth cadence runs over eligible opens.
pub struct AppOpenGate {
    config: AppOpenConfig,
    prefs: Arc<PrefsStore>,
    loaded_at_ms: Mutex<Option<u64>>,
}

impl AppOpenGate {
    pub fn new(config: AppOpenConfig, prefs: Arc<PrefsStore>) -> Self {
        Self {
            config,
            prefs,
            loaded_at_ms: Mutex::new(None),
        }
    }

    fn max_age_ms(&self) -> u64 {
        self.config.max_ad_age_hours * 60 * 60 * 1000
    }

    /// Record that a prefetched app-open ad finished loading.
    pub fn record_loaded(&self, now_ms: u64) {
        debug!("app-open ad loaded");
        *self.loaded_at_ms.lock() = Some(now_ms);
    }

    /// Whether a held ad exists and is younger than the staleness window.
    pub fn is_ad_fresh(&self, now_ms: u64) -> bool {
        self.loaded_at_ms
            .lock()
            .map(|loaded| now_ms.saturating_sub(loaded) < self.max_age_ms())
            .unwrap_or(false)
    }

    /// Gate one app open.
    pub fn track_open(&self, now_ms: u64) -> Result<AppOpenOutcome> {
        if self.prefs.is_ad_free(now_ms) {
            debug!("ad-free window active, app-open ad suppressed");
            return Ok(AppOpenOutcome::AdFree);
        }

        if !self.is_ad_fresh(now_ms) {
            debug!("no fresh app-open ad held, fetch needed");
            return Ok(AppOpenOutcome::NotReady);
        }

        let mut opens = 0;
        self.prefs.update(|prefs| {
            prefs.app_open_count += 1;
            opens = prefs.app_open_count;
        })?;
        debug!(opens, show_every = self.config.show_every, "app open tracked");

        if opens % self.config.show_every != 0 {
            return Ok(AppOpenOutcome::Skipped { opens });
        }

        info!(opens, "app-open ad due");
        Ok(AppOpenOutcome::Show)
    }

    /// Record that the held ad was shown or failed to show. Either way the
    /// creative is consumed and the next open needs a fresh fetch.
    pub fn record_shown(&self) {
        *self.loaded_at_ms.lock() = None;
    }

    pub fn open_count(&self) -> u32 {
        self.prefs.get().app_open_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn gate(dir: &tempfile::TempDir) -> AppOpenGate {
        let prefs = Arc::new(PrefsStore::load(dir.path().join("ad_prefs.json")));
        AppOpenGate::new(AppOpenConfig::default(), prefs)
    }

    #[test]
    fn shows_every_second_eligible_open() {
        let dir = tempdir().unwrap();
        let gate = gate(&dir);
        let now = 1_000_000;

        gate.record_loaded(now);
        assert_eq!(
            gate.track_open(now).unwrap(),
            AppOpenOutcome::Skipped { opens: 1 }
        );
        assert_eq!(gate.track_open(now).unwrap(), AppOpenOutcome::Show);

        // Shown ad is consumed; the next open needs a fresh creative.
        gate.record_shown();
        assert_eq!(gate.track_open(now).unwrap(), AppOpenOutcome::NotReady);

        gate.record_loaded(now);
        assert_eq!(
            gate.track_open(now).unwrap(),
            AppOpenOutcome::Skipped { opens: 3 }
        );
        assert_eq!(gate.track_open(now).unwrap(), AppOpenOutcome::Show);
    }

    #[test]
    fn stale_ad_is_never_shown() {
        let dir = tempdir().unwrap();
        let gate = gate(&dir);
        let now = 1_000_000;

        gate.record_loaded(now);
        let later = now + 4 * 60 * 60 * 1000;
        assert!(!gate.is_ad_fresh(later));
        assert_eq!(gate.track_open(later).unwrap(), AppOpenOutcome::NotReady);
        assert_eq!(gate.open_count(), 0, "ineligible opens are not counted");

        gate.record_loaded(later);
        assert!(gate.is_ad_fresh(later + 1));
        assert_eq!(
            gate.track_open(later).unwrap(),
            AppOpenOutcome::Skipped { opens: 1 }
        );
    }

    #[test]
    fn ad_free_window_suppresses_app_open() {
        let dir = tempdir().unwrap();
        let prefs = Arc::new(PrefsStore::load(dir.path().join("ad_prefs.json")));
        let gate = AppOpenGate::new(AppOpenConfig::default(), prefs.clone());
        let now = 1_000_000;

        prefs.activate_ad_free(90, now).unwrap();
        gate.record_loaded(now);
        assert_eq!(gate.track_open(now).unwrap(), AppOpenOutcome::AdFree);
        assert_eq!(gate.open_count(), 0);
    }

    #[test]
    fn open_counter_survives_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ad_prefs.json");
        let now = 1_000_000;

        let prefs = Arc::new(PrefsStore::load(&path));
        let first = AppOpenGate::new(AppOpenConfig::default(), prefs);
        first.record_loaded(now);
        assert_eq!(
            first.track_open(now).unwrap(),
            AppOpenOutcome::Skipped { opens: 1 }
        );

        let prefs = Arc::new(PrefsStore::load(&path));
        let second = AppOpenGate::new(AppOpenConfig::default(), prefs);
        second.record_loaded(now);
        assert_eq!(second.track_open(now).unwrap(), AppOpenOutcome::Show);
    }
}
