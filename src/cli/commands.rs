// CLI Command Implementations
// Executes each command with colored output

use super::{error, info, success, warning, Cli, Commands};
use crate::ads::appopen::{AppOpenGate, AppOpenOutcome};
use crate::ads::banner::BannerAdManager;
use crate::ads::interstitial::{GateOutcome, InterstitialGate};
use crate::ads::prefs::{now_ms, PrefsStore};
use crate::ads::rewarded::RewardedGate;
use crate::ads::sim::{SimContainer, SimFactory, SimReadiness};
use crate::ads::Container;
use crate::config::AppConfig;
use crate::media::saver::FileSaver;
use crate::media::scanner::StatusScanner;
use crate::media::{MediaItem, MediaKind};
use crate::observability::op_span;
use crate::signals;
use anyhow::{Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Scan { format, dir } => scan_command(&config, &format, dir),
        Commands::Save { files } => save_command(&config, files),
        Commands::Status => status_command(&config),
        Commands::Reward => reward_command(&config),
        Commands::Browse { screens, dwell_ms } => browse_command(&config, screens, dwell_ms).await,
        Commands::Validate => validate_command(&cli.config),
    }
}

/// Scan the status folders and list what was found
fn scan_command(config: &AppConfig, format: &str, dir: Option<PathBuf>) -> Result<()> {
    let _span = op_span("scan").entered();

    let scanner = match dir {
        Some(dir) => StatusScanner::new(vec![dir]),
        None => StatusScanner::new(config.scanner.roots()),
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    spinner.set_message("Scanning status folders...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let report = scanner.scan_all();
    spinner.finish_and_clear();

    if format == "json" {
        let json = serde_json::json!({
            "images": report.images,
            "videos": report.videos,
            "audio": report.audio,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    if report.is_empty() {
        warning("No status media found");
        info("Statuses only appear after they were viewed in the messaging app");
        return Ok(());
    }

    print_group("IMAGES", &report.images);
    print_group("VIDEOS", &report.videos);
    print_group("AUDIO", &report.audio);
    println!();
    success(&format!("{} status files found", report.total()));
    Ok(())
}

fn print_group(title: &str, items: &[MediaItem]) {
    if items.is_empty() {
        return;
    }
    println!();
    println!("{} ({})", title.bright_white().bold(), items.len());
    for item in items {
        let modified: chrono::DateTime<chrono::Local> = item.modified.into();
        println!(
            "  {}  {:>8}  {}",
            modified.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            item.formatted_size(),
            item.path.display()
        );
    }
}

/// Save chosen files and feed the interstitial gate
fn save_command(config: &AppConfig, files: Vec<PathBuf>) -> Result<()> {
    let _span = op_span("save").entered();

    if files.is_empty() {
        error("No files given");
        info("Run `statussaver scan` to list saveable status media");
        anyhow::bail!("nothing to save");
    }

    let saver = FileSaver::new(config.storage.save_dir.clone());
    let prefs = Arc::new(PrefsStore::load(&config.storage.prefs_path));
    let gate = InterstitialGate::new(config.ads.interstitial_config(), prefs);

    let mut saved = 0usize;
    for file in &files {
        let item = match media_item_from_path(file) {
            Ok(item) => item,
            Err(e) => {
                error(&format!("{}: {e:#}", file.display()));
                continue;
            }
        };
        match saver.save(&item) {
            Ok(target) => {
                saved += 1;
                success(&format!("{} -> {}", item.file_name, target.display()));
                apply_save_gate(&gate)?;
            }
            Err(e) => error(&format!("{}: {e}", item.file_name)),
        }
    }

    if saved == 0 {
        anyhow::bail!("no files were saved");
    }
    println!();
    success(&format!(
        "{saved} file(s) saved to {}",
        saver.dest_dir().display()
    ));
    Ok(())
}

fn apply_save_gate(gate: &InterstitialGate) -> Result<()> {
    match gate.track_save(now_ms())? {
        GateOutcome::Show => {
            // No real ad network here; showing is a log line plus the
            // cooldown bookkeeping a real show would trigger.
            info(&"[ad] interstitial break".yellow().to_string());
            gate.record_shown(now_ms())?;
        }
        outcome => tracing::debug!(%outcome, "save interstitial gate"),
    }
    Ok(())
}

fn media_item_from_path(path: &Path) -> Result<MediaItem> {
    let file_name = path
        .file_name()
        .context("path has no file name")?
        .to_string_lossy()
        .to_string();
    let kind = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(MediaKind::from_extension)
        .context("not a supported media file")?;
    let metadata = std::fs::metadata(path).context("cannot read file")?;

    Ok(MediaItem {
        path: path.to_path_buf(),
        file_name,
        kind,
        size: metadata.len(),
        modified: metadata
            .modified()
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH),
    })
}

/// Show ad gating status
fn status_command(config: &AppConfig) -> Result<()> {
    let prefs = Arc::new(PrefsStore::load(&config.storage.prefs_path));
    let interstitial = InterstitialGate::new(config.ads.interstitial_config(), prefs.clone());
    let rewarded = RewardedGate::new(config.ads.rewarded_config(), prefs.clone());
    let now = now_ms();

    println!("{}", "Ad status".bright_white().bold());

    if prefs.is_ad_free(now) {
        let secs = prefs.ad_free_remaining_secs(now);
        success(&format!("Ad-free window active: {}m {}s left", secs / 60, secs % 60));
    } else {
        info("No ad-free window active");
    }

    info(&format!(
        "Saves until next interstitial: {}/{}",
        interstitial.save_count(),
        config.ads.interstitial_save_threshold
    ));

    info(&format!(
        "App opens recorded: {} (ad every {} opens)",
        prefs.get().app_open_count,
        config.ads.app_open_show_every
    ));

    if rewarded.can_watch(now) {
        info("Rewarded video available - run `statussaver reward`");
    } else {
        let minutes = rewarded.minutes_until_next(now);
        info(&format!(
            "Next rewarded video in {}h {}m",
            minutes / 60,
            minutes % 60
        ));
    }
    Ok(())
}

/// Simulate watching a rewarded video
fn reward_command(config: &AppConfig) -> Result<()> {
    let prefs = Arc::new(PrefsStore::load(&config.storage.prefs_path));
    let rewarded = RewardedGate::new(config.ads.rewarded_config(), prefs);
    let now = now_ms();

    if !rewarded.can_watch(now) {
        let minutes = rewarded.minutes_until_next(now);
        warning(&format!(
            "Reward available in {}h {}m",
            minutes / 60,
            minutes % 60
        ));
        return Ok(());
    }

    info("Playing rewarded video...");
    rewarded.grant(now)?;
    success(&format!(
        "Enjoy {} minutes without ads!",
        config.ads.ad_free_minutes
    ));
    Ok(())
}

/// Walk through simulated screens so the persistent banner surface gets
/// attached, rebound, health-checked, and finally shut down.
async fn browse_command(config: &AppConfig, screens: u32, dwell_ms: u64) -> Result<()> {
    super::print_banner();

    let prefs = Arc::new(PrefsStore::load(&config.storage.prefs_path));

    let readiness = Arc::new(SimReadiness::ready_after(1));
    let factory = Arc::new(SimFactory::auto_succeed());
    let (banner, join) = BannerAdManager::spawn_with_prefs(
        config.ads.banner_config(),
        readiness,
        factory.clone(),
        prefs.clone(),
    );

    // Opening the browse session counts as bringing the app forward.
    let app_open = AppOpenGate::new(config.ads.app_open_config(), prefs.clone());
    app_open.record_loaded(now_ms());
    match app_open.track_open(now_ms())? {
        AppOpenOutcome::Show => {
            info(&"[ad] app-open break".yellow().to_string());
            app_open.record_shown();
        }
        outcome => info(&format!("App-open ad: {outcome}")),
    }

    let interstitial = InterstitialGate::new(config.ads.interstitial_config(), prefs);
    match interstitial.track_app_interaction(now_ms())? {
        GateOutcome::Show => {
            info(&"[ad] welcome interstitial".yellow().to_string());
            interstitial.record_shown(now_ms())?;
        }
        outcome => info(&format!("Welcome interstitial: {outcome}")),
    }

    let shutdown = signals::create_shutdown_listener()?;
    tokio::pin!(shutdown);

    // Containers must outlive their binding; the manager only holds
    // weak references to them.
    let mut hosts: Vec<Arc<SimContainer>> = Vec::new();

    for i in 0..screens {
        let container = Arc::new(SimContainer::new(format!("screen-{i}")));
        hosts.push(container.clone());
        banner.attach(container as Arc<dyn Container>);
        info(&format!("Viewing screen {i}"));

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(dwell_ms)) => {}
            _ = &mut shutdown => {
                warning("Interrupted");
                break;
            }
        }
    }

    banner.detach();
    banner.shutdown();
    join.await.context("banner manager task failed")?;

    success(&format!(
        "Browse finished: {} surface(s) created, {} destroyed",
        factory.created_count(),
        factory.destroyed_count()
    ));
    Ok(())
}

/// Validate the configuration file
fn validate_command(path: &str) -> Result<()> {
    if !Path::new(path).exists() {
        warning(&format!("{path} not found, defaults would be used"));
        return Ok(());
    }
    match AppConfig::load(path) {
        Ok(_) => {
            success(&format!("{path} is valid"));
            Ok(())
        }
        Err(e) => {
            error(&format!("{path} is invalid: {e:#}"));
            Err(e)
        }
    }
}
