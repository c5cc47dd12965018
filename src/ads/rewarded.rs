// Rewarded video gating
// A completed video grants an ad-free window; earning another reward is
// held behind a long cooldown

use super::prefs::PrefsStore;
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Rewarded video configuration
#[derive(Debug, Clone)]
pub struct RewardedConfig {
    /// Gap before another reward can be earned
    pub cooldown_hours: u64,

    /// Length of the granted ad-free window
    pub ad_free_minutes: u64,
}

impl Default for RewardedConfig {
    fn default() -> Self {
        Self {
            cooldown_hours: 30,
            ad_free_minutes: 90,
        }
    }
}

/// Decides when the user may watch a rewarded video and applies the
/// ad-free grant once they have.
pub struct RewardedGate {
    config: RewardedConfig,
    prefs: Arc<PrefsStore>,
}

impl RewardedGate {
    pub fn new(config: RewardedConfig, prefs: Arc<PrefsStore>) -> Self {
        Self { config, prefs }
    }

    fn cooldown_ms(&self) -> u64 {
        self.config.cooldown_hours * 60 * 60 * 1000
    }

    /// Whether the reward cooldown has elapsed.
    pub fn can_watch(&self, now_ms: u64) -> bool {
        let last = self.prefs.get().last_reward_ms;
        now_ms.saturating_sub(last) >= self.cooldown_ms()
    }

    /// Minutes until the next reward becomes available, 0 when ready.
    pub fn minutes_until_next(&self, now_ms: u64) -> u64 {
        let last = self.prefs.get().last_reward_ms;
        let elapsed = now_ms.saturating_sub(last);
        self.cooldown_ms().saturating_sub(elapsed) / 1000 / 60
    }

    /// Apply the reward for a fully watched video: start the ad-free
    /// window and the next-reward cooldown.
    pub fn grant(&self, now_ms: u64) -> Result<()> {
        info!(
            ad_free_minutes = self.config.ad_free_minutes,
            "rewarded video completed, granting ad-free window"
        );
        self.prefs
            .activate_ad_free(self.config.ad_free_minutes, now_ms)?;
        self.prefs.update(|prefs| prefs.last_reward_ms = now_ms)
    }

    /// Seconds left in the current ad-free window.
    pub fn ad_free_remaining_secs(&self, now_ms: u64) -> u64 {
        self.prefs.ad_free_remaining_secs(now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn grant_starts_window_and_cooldown() {
        let dir = tempdir().unwrap();
        let prefs = Arc::new(PrefsStore::load(dir.path().join("ad_prefs.json")));
        let gate = RewardedGate::new(RewardedConfig::default(), prefs.clone());
        let now = 1_000_000;

        assert!(gate.can_watch(now), "first reward is always available");
        gate.grant(now).unwrap();

        assert!(prefs.is_ad_free(now));
        assert_eq!(gate.ad_free_remaining_secs(now), 90 * 60);
        assert!(!gate.can_watch(now + 1));
        assert_eq!(gate.minutes_until_next(now), 30 * 60);
    }

    #[test]
    fn cooldown_elapses() {
        let dir = tempdir().unwrap();
        let prefs = Arc::new(PrefsStore::load(dir.path().join("ad_prefs.json")));
        let gate = RewardedGate::new(RewardedConfig::default(), prefs);
        let now = 1_000_000;

        gate.grant(now).unwrap();
        let after = now + 30 * 60 * 60 * 1000;
        assert!(gate.can_watch(after));
        assert_eq!(gate.minutes_until_next(after), 0);
    }
}
