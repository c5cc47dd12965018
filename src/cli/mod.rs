// Command Line Interface Module
// clap-powered commands for scanning, saving, and ad diagnostics

pub mod commands;

use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

/// Status Saver - find and keep disappearing status media
#[derive(Parser)]
#[command(name = "statussaver")]
#[command(author = "Status Saver Team")]
#[command(version = "0.4.0")]
#[command(about = "Save status media before it disappears", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "statussaver.toml")]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan status folders and list discovered media
    Scan {
        /// Output format: table or json
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Scan this directory instead of the configured roots
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Copy status files into the persistent save directory
    Save {
        /// Files to save (paths reported by scan)
        files: Vec<PathBuf>,
    },

    /// Show ad gating status: ad-free window, counters, cooldowns
    Status,

    /// Watch a (simulated) rewarded video to earn an ad-free window
    Reward,

    /// Navigate simulated screens, exercising the persistent banner
    Browse {
        /// Number of screens to visit
        #[arg(short, long, default_value = "4")]
        screens: u32,

        /// Dwell time per screen in milliseconds
        #[arg(short = 'd', long, default_value = "2000")]
        dwell_ms: u64,
    },

    /// Validate the configuration file
    Validate,
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    println!("{} {}", "✗".red().bold(), msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{} {}", "⚠".yellow().bold(), msg);
}

/// Print the Status Saver banner
pub fn print_banner() {
    println!(
        "{}",
        r#"
╔═══════════════════════════════════════════╗
║                                           ║
║   STATUS SAVER  v0.4.0                    ║
║                                           ║
║   Keep status media before it disappears  ║
║                                           ║
╚═══════════════════════════════════════════╝
    "#
        .bright_cyan()
        .bold()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["statussaver", "scan", "--format", "json"]);
        assert!(matches!(cli.command, Commands::Scan { .. }));
    }

    #[test]
    fn test_browse_defaults() {
        let cli = Cli::parse_from(["statussaver", "browse"]);
        match cli.command {
            Commands::Browse { screens, dwell_ms } => {
                assert_eq!(screens, 4);
                assert_eq!(dwell_ms, 2000);
            }
            _ => panic!("expected browse"),
        }
    }
}
