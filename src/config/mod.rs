// Configuration Management Module
// Handles statussaver.toml loading, defaults, and validation

use crate::ads::appopen::AppOpenConfig;
use crate::ads::banner::BannerConfig;
use crate::ads::interstitial::InterstitialConfig;
use crate::ads::retry::BackoffPolicy;
use crate::ads::rewarded::RewardedConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::time::Duration;
use tracing::{info, warn};

/// Main Status Saver configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub ads: AdsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Storage base the status folders are resolved against
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Status folders relative to the base
    #[serde(default = "default_status_dirs")]
    pub status_dirs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Where chosen media is copied to
    #[serde(default = "default_save_dir")]
    pub save_dir: PathBuf,

    /// Ad preference store location
    #[serde(default = "default_prefs_path")]
    pub prefs_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdsConfig {
    #[serde(default = "default_placement_id")]
    pub placement_id: String,

    /// Base retry delay in seconds
    #[serde(default = "default_retry_base")]
    pub retry_base_secs: u64,

    /// Retry delay ceiling in seconds
    #[serde(default = "default_retry_cap")]
    pub retry_cap_secs: u64,

    /// Give-up ceiling; absent means retry forever
    #[serde(default)]
    pub max_retry_attempts: Option<u32>,

    #[serde(default = "default_health_interval")]
    pub health_interval_secs: u64,

    #[serde(default = "default_save_threshold")]
    pub interstitial_save_threshold: u32,

    #[serde(default = "default_interstitial_cooldown")]
    pub interstitial_cooldown_mins: u64,

    #[serde(default = "default_reward_cooldown")]
    pub rewarded_cooldown_hours: u64,

    #[serde(default = "default_ad_free_minutes")]
    pub ad_free_minutes: u64,

    /// App-open ad shown on every Nth open
    #[serde(default = "default_app_open_show_every")]
    pub app_open_show_every: u32,

    /// Prefetched app-open ad goes stale after this many hours
    #[serde(default = "default_app_open_max_age")]
    pub app_open_max_ad_age_hours: u64,
}

// Default value functions
fn default_base_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}
fn default_status_dirs() -> Vec<String> {
    crate::media::scanner::DEFAULT_STATUS_DIRS
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_save_dir() -> PathBuf {
    default_base_dir().join("Downloads/StatusSaver")
}
fn default_prefs_path() -> PathBuf {
    default_base_dir().join(".statussaver/ad_prefs.json")
}
fn default_placement_id() -> String {
    "banner-main".to_string()
}
fn default_retry_base() -> u64 {
    2
}
fn default_retry_cap() -> u64 {
    10
}
fn default_health_interval() -> u64 {
    5
}
fn default_save_threshold() -> u32 {
    7
}
fn default_interstitial_cooldown() -> u64 {
    10
}
fn default_reward_cooldown() -> u64 {
    30
}
fn default_ad_free_minutes() -> u64 {
    90
}
fn default_app_open_show_every() -> u32 {
    2
}
fn default_app_open_max_age() -> u64 {
    4
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            status_dirs: default_status_dirs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            save_dir: default_save_dir(),
            prefs_path: default_prefs_path(),
        }
    }
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            placement_id: default_placement_id(),
            retry_base_secs: default_retry_base(),
            retry_cap_secs: default_retry_cap(),
            max_retry_attempts: None,
            health_interval_secs: default_health_interval(),
            interstitial_save_threshold: default_save_threshold(),
            interstitial_cooldown_mins: default_interstitial_cooldown(),
            rewarded_cooldown_hours: default_reward_cooldown(),
            ad_free_minutes: default_ad_free_minutes(),
            app_open_show_every: default_app_open_show_every(),
            app_open_max_ad_age_hours: default_app_open_max_age(),
        }
    }
}

impl ScannerConfig {
    /// Absolute status folder paths.
    pub fn roots(&self) -> Vec<PathBuf> {
        self.status_dirs
            .iter()
            .map(|dir| self.base_dir.join(dir))
            .collect()
    }
}

impl AdsConfig {
    pub fn banner_config(&self) -> BannerConfig {
        BannerConfig {
            placement_id: self.placement_id.clone(),
            backoff: BackoffPolicy {
                base: Duration::from_secs(self.retry_base_secs),
                cap: Duration::from_secs(self.retry_cap_secs),
                max_attempts: self.max_retry_attempts,
            },
            health_interval: Duration::from_secs(self.health_interval_secs),
        }
    }

    pub fn interstitial_config(&self) -> InterstitialConfig {
        InterstitialConfig {
            save_threshold: self.interstitial_save_threshold,
            cooldown_mins: self.interstitial_cooldown_mins,
        }
    }

    pub fn rewarded_config(&self) -> RewardedConfig {
        RewardedConfig {
            cooldown_hours: self.rewarded_cooldown_hours,
            ad_free_minutes: self.ad_free_minutes,
        }
    }

    pub fn app_open_config(&self) -> AppOpenConfig {
        AppOpenConfig {
            show_every: self.app_open_show_every,
            max_ad_age_hours: self.app_open_max_ad_age_hours,
        }
    }
}

impl AppConfig {
    /// Load configuration from file or use defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let contents =
                std::fs::read_to_string(path).context("Failed to read configuration file")?;

            let config: AppConfig =
                toml::from_str(&contents).context("Failed to parse configuration file")?;

            config.validate()?;
            Ok(config)
        } else {
            warn!("Configuration file not found, using defaults");
            info!("Create statussaver.toml to customize configuration");
            Ok(Self::default())
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.scanner.status_dirs.is_empty() {
            anyhow::bail!("At least one status directory is required");
        }

        if self.ads.placement_id.is_empty() {
            anyhow::bail!("Ad placement id cannot be empty");
        }

        if self.ads.retry_base_secs == 0 {
            anyhow::bail!("Retry base delay must be at least 1 second");
        }

        if self.ads.retry_cap_secs < self.ads.retry_base_secs {
            anyhow::bail!("Retry cap must not be below the base delay");
        }

        if self.ads.max_retry_attempts == Some(0) {
            anyhow::bail!("Retry attempt ceiling must be at least 1 when set");
        }

        if self.ads.health_interval_secs == 0 {
            anyhow::bail!("Health check interval must be at least 1 second");
        }

        if self.ads.interstitial_save_threshold == 0 {
            anyhow::bail!("Interstitial save threshold must be at least 1");
        }

        if self.ads.ad_free_minutes == 0 {
            anyhow::bail!("Ad-free window must be at least 1 minute");
        }

        if self.ads.app_open_show_every == 0 {
            anyhow::bail!("App-open show interval must be at least 1");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.ads.interstitial_save_threshold, 7);
        assert_eq!(config.ads.retry_base_secs, 2);
        assert_eq!(config.scanner.status_dirs.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_retry_cap() {
        let mut config = AppConfig::default();
        config.ads.retry_cap_secs = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_app_open_config_conversion() {
        let config = AppConfig::default();
        let app_open = config.ads.app_open_config();
        assert_eq!(app_open.show_every, 2);
        assert_eq!(app_open.max_ad_age_hours, 4);

        let mut config = AppConfig::default();
        config.ads.app_open_show_every = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_attempt_ceiling_rejected() {
        let mut config = AppConfig::default();
        config.ads.max_retry_attempts = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [ads]
            interstitial_save_threshold = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.ads.interstitial_save_threshold, 5);
        assert_eq!(config.ads.retry_cap_secs, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_banner_config_conversion() {
        let config = AppConfig::default();
        let banner = config.ads.banner_config();
        assert_eq!(banner.backoff.base, Duration::from_secs(2));
        assert_eq!(banner.backoff.cap, Duration::from_secs(10));
        assert_eq!(banner.health_interval, Duration::from_secs(5));
    }
}
