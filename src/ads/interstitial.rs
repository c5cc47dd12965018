// Interstitial gating
// Full-screen ads fire after a save threshold or on app interaction with
// a cooldown, and never during an ad-free window

use super::prefs::PrefsStore;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// Interstitial gate configuration
#[derive(Debug, Clone)]
pub struct InterstitialConfig {
    /// Saves between save-triggered interstitials
    pub save_threshold: u32,

    /// Minimum gap between interaction-triggered interstitials
    pub cooldown_mins: u64,
}

impl Default for InterstitialConfig {
    fn default() -> Self {
        Self {
            save_threshold: 7,
            cooldown_mins: 10,
        }
    }
}

/// Outcome of consulting a gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Threshold or cooldown satisfied, show the ad now
    Show,

    /// Suppressed by an active ad-free window
    AdFree,

    /// Save counter has not reached the threshold yet
    BelowThreshold { count: u32, threshold: u32 },

    /// Interaction cooldown still running
    Cooldown { remaining_secs: u64 },
}

impl std::fmt::Display for GateOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateOutcome::Show => write!(f, "show"),
            GateOutcome::AdFree => write!(f, "suppressed (ad-free)"),
            GateOutcome::BelowThreshold { count, threshold } => {
                write!(f, "below threshold ({count}/{threshold})")
            }
            GateOutcome::Cooldown { remaining_secs } => {
                write!(f, "on cooldown ({remaining_secs}s left)")
            }
        }
    }
}

/// Decides when an interstitial may be shown. Pure threshold/timer
/// bookkeeping on top of the shared preference store; callers report the
/// actual show back via `record_shown`.
pub struct InterstitialGate {
    config: InterstitialConfig,
    prefs: Arc<PrefsStore>,
}

impl InterstitialGate {
    pub fn new(config: InterstitialConfig, prefs: Arc<PrefsStore>) -> Self {
        Self { config, prefs }
    }

    /// Count one completed save. Returns `Show` every `save_threshold`
    /// saves, resetting the counter.
    pub fn track_save(&self, now_ms: u64) -> Result<GateOutcome> {
        if self.prefs.is_ad_free(now_ms) {
            debug!("ad-free window active, save interstitial suppressed");
            return Ok(GateOutcome::AdFree);
        }

        let mut count = 0;
        self.prefs.update(|prefs| {
            prefs.interstitial_save_count += 1;
            count = prefs.interstitial_save_count;
        })?;
        debug!(count, threshold = self.config.save_threshold, "save tracked");

        if count >= self.config.save_threshold {
            self.prefs.update(|prefs| prefs.interstitial_save_count = 0)?;
            info!("save threshold reached, interstitial due");
            return Ok(GateOutcome::Show);
        }

        Ok(GateOutcome::BelowThreshold {
            count,
            threshold: self.config.save_threshold,
        })
    }

    /// Gate an interaction-triggered interstitial on the cooldown window.
    pub fn track_app_interaction(&self, now_ms: u64) -> Result<GateOutcome> {
        if self.prefs.is_ad_free(now_ms) {
            debug!("ad-free window active, interaction interstitial suppressed");
            return Ok(GateOutcome::AdFree);
        }

        let cooldown_ms = self.config.cooldown_mins * 60 * 1000;
        let last = self.prefs.get().last_interstitial_ms;
        let elapsed = now_ms.saturating_sub(last);

        if elapsed < cooldown_ms {
            let remaining_secs = (cooldown_ms - elapsed) / 1000;
            debug!(remaining_secs, "interaction interstitial on cooldown");
            return Ok(GateOutcome::Cooldown { remaining_secs });
        }

        Ok(GateOutcome::Show)
    }

    /// Record that an interstitial finished showing, starting the cooldown.
    pub fn record_shown(&self, now_ms: u64) -> Result<()> {
        self.prefs.update(|prefs| prefs.last_interstitial_ms = now_ms)
    }

    pub fn reset_save_count(&self) -> Result<()> {
        self.prefs.update(|prefs| prefs.interstitial_save_count = 0)
    }

    pub fn save_count(&self) -> u32 {
        self.prefs.get().interstitial_save_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn gate(dir: &tempfile::TempDir) -> InterstitialGate {
        let prefs = Arc::new(PrefsStore::load(dir.path().join("ad_prefs.json")));
        InterstitialGate::new(InterstitialConfig::default(), prefs)
    }

    #[test]
    fn seventh_save_triggers_and_resets() {
        let dir = tempdir().unwrap();
        let gate = gate(&dir);
        let now = 1_000;

        for i in 1..7 {
            assert_eq!(
                gate.track_save(now).unwrap(),
                GateOutcome::BelowThreshold {
                    count: i,
                    threshold: 7
                }
            );
        }
        assert_eq!(gate.track_save(now).unwrap(), GateOutcome::Show);
        assert_eq!(gate.save_count(), 0);
    }

    #[test]
    fn ad_free_window_suppresses_both_triggers() {
        let dir = tempdir().unwrap();
        let prefs = Arc::new(PrefsStore::load(dir.path().join("ad_prefs.json")));
        let gate = InterstitialGate::new(InterstitialConfig::default(), prefs.clone());
        let now = 1_000_000;

        prefs.activate_ad_free(90, now).unwrap();
        assert_eq!(gate.track_save(now).unwrap(), GateOutcome::AdFree);
        assert_eq!(gate.track_app_interaction(now).unwrap(), GateOutcome::AdFree);
        assert_eq!(gate.save_count(), 0, "suppressed saves are not counted");
    }

    #[test]
    fn interaction_cooldown_enforced() {
        let dir = tempdir().unwrap();
        let gate = gate(&dir);
        let now = 10_000_000;

        assert_eq!(gate.track_app_interaction(now).unwrap(), GateOutcome::Show);
        gate.record_shown(now).unwrap();

        let during = now + 5 * 60 * 1000;
        assert_eq!(
            gate.track_app_interaction(during).unwrap(),
            GateOutcome::Cooldown {
                remaining_secs: 5 * 60
            }
        );

        let after = now + 10 * 60 * 1000;
        assert_eq!(gate.track_app_interaction(after).unwrap(), GateOutcome::Show);
    }
}
