// Persistent ad preferences
// Save counters, cooldown timestamps, and the ad-free window, stored as JSON

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Milliseconds since the unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Durable counters and timestamps shared by the ad gates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdPrefs {
    /// End of the current ad-free window, 0 when none was ever granted
    #[serde(default)]
    pub ad_free_expiry_ms: u64,

    /// Saves since the last save-triggered interstitial
    #[serde(default)]
    pub interstitial_save_count: u32,

    /// When the last interstitial finished showing
    #[serde(default)]
    pub last_interstitial_ms: u64,

    /// When the last rewarded video was completed
    #[serde(default)]
    pub last_reward_ms: u64,

    /// App opens counted towards the next app-open ad
    #[serde(default)]
    pub app_open_count: u32,
}

/// File-backed store for `AdPrefs`. Every mutation is written through to
/// disk so counters survive restarts the way the app's preference store
/// did.
pub struct PrefsStore {
    path: PathBuf,
    prefs: Mutex<AdPrefs>,
}

impl PrefsStore {
    /// Load the store, falling back to defaults when the file is missing
    /// or unreadable.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let prefs = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(prefs) => {
                    debug!(path = %path.display(), "ad preferences loaded");
                    prefs
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt ad preferences, starting fresh");
                    AdPrefs::default()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "no ad preferences yet, using defaults");
                AdPrefs::default()
            }
        };
        Self {
            path,
            prefs: Mutex::new(prefs),
        }
    }

    /// Snapshot of the current preferences.
    pub fn get(&self) -> AdPrefs {
        self.prefs.lock().clone()
    }

    /// Mutate the preferences and persist them.
    pub fn update<F: FnOnce(&mut AdPrefs)>(&self, f: F) -> Result<()> {
        let snapshot = {
            let mut prefs = self.prefs.lock();
            f(&mut prefs);
            prefs.clone()
        };
        self.persist(&snapshot)
    }

    fn persist(&self, prefs: &AdPrefs) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(prefs)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }

    /// Whether an ad-free window is currently active.
    pub fn is_ad_free(&self, now_ms: u64) -> bool {
        now_ms < self.prefs.lock().ad_free_expiry_ms
    }

    /// Grant an ad-free window of the given length.
    pub fn activate_ad_free(&self, minutes: u64, now_ms: u64) -> Result<()> {
        info!(minutes, "ad-free window activated");
        self.update(|prefs| {
            prefs.ad_free_expiry_ms = now_ms + minutes * 60 * 1000;
        })
    }

    /// Seconds left in the ad-free window, 0 when none is active.
    pub fn ad_free_remaining_secs(&self, now_ms: u64) -> u64 {
        let expiry = self.prefs.lock().ad_free_expiry_ms;
        expiry.saturating_sub(now_ms) / 1000
    }
}
