//! Configuration parsing, validation and the persisted schedule settings

use crate::constants::classify::{MIN_THRESHOLD_GAP_DB, THRESHOLD_RANGE};
use crate::constants::files::{APP_DIR, LOG_FILE, SCHEDULE_FILE};
use crate::constants::level::{CALIBRATION_RANGE, DEFAULT_CALIBRATION_DB, DEFAULT_EMA_ALPHA};
use crate::error::{AppError, AppResult};
use crate::monitor::Settings;
use crate::schedule::{ScheduleConfig, minutes_of_day};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Command line arguments for the quietward application
#[derive(Parser)]
#[command(name = "quietward")]
#[command(about = "Ward noise monitor with A-weighted levels and a day/night schedule")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Monitor the ward noise level in the terminal
    Monitor(MonitorArgs),
    /// List available audio input devices
    List(ListArgs),
    /// Show or change the persisted day/night schedule
    Schedule(ScheduleArgs),
}

#[derive(Parser)]
pub struct MonitorArgs {
    /// Audio input device name (optional, uses default if not specified)
    #[arg(long)]
    pub device: Option<String>,

    /// Calibration offset added to dBFS to approximate dB(A)
    #[arg(long, default_value_t = DEFAULT_CALIBRATION_DB)]
    pub calibration: f32,

    /// Smoothing weight of the previous value, between 0 and 1 (higher = slower)
    #[arg(long, default_value_t = DEFAULT_EMA_ALPHA)]
    pub ema_alpha: f32,

    /// Override the green upper threshold in dB(A)
    #[arg(long)]
    pub green_max: Option<f32>,

    /// Override the amber upper threshold in dB(A)
    #[arg(long)]
    pub amber_max: Option<f32>,

    /// Schedule settings file (defaults to the user config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log file (defaults to the user config directory)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Open the monitor without starting capture; press 's' to start
    #[arg(long)]
    pub no_autostart: bool,
}

#[derive(Parser)]
pub struct ListArgs {}

#[derive(Parser)]
pub struct ScheduleArgs {
    /// Enable or disable automatic day/night switching
    #[arg(long)]
    pub auto: Option<bool>,

    /// Night window start (HH:MM)
    #[arg(long)]
    pub night_start: Option<String>,

    /// Night window end (HH:MM)
    #[arg(long)]
    pub night_end: Option<String>,

    /// Schedule settings file (defaults to the user config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Application configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct Config {
    pub device_name: Option<String>,
    pub settings: Settings,
    pub green_max: Option<f32>,
    pub amber_max: Option<f32>,
    pub schedule_path: PathBuf,
    pub log_path: PathBuf,
    pub autostart: bool,
}

impl Config {
    /// Create configuration from monitor arguments
    pub fn from_monitor_args(args: MonitorArgs) -> AppResult<Self> {
        if !(CALIBRATION_RANGE.0..=CALIBRATION_RANGE.1).contains(&args.calibration) {
            return Err(AppError::Config(format!(
                "Calibration must be between {} and {} dB, got {}",
                CALIBRATION_RANGE.0, CALIBRATION_RANGE.1, args.calibration
            )));
        }

        if !(args.ema_alpha > 0.0 && args.ema_alpha < 1.0) {
            return Err(AppError::Config(format!(
                "Smoothing weight must be strictly between 0 and 1, got {}",
                args.ema_alpha
            )));
        }

        for (name, value) in [("Green", args.green_max), ("Amber", args.amber_max)] {
            if let Some(db) = value
                && !(THRESHOLD_RANGE.0..=THRESHOLD_RANGE.1).contains(&db)
            {
                return Err(AppError::Config(format!(
                    "{} threshold must be between {} and {} dB, got {}",
                    name, THRESHOLD_RANGE.0, THRESHOLD_RANGE.1, db
                )));
            }
        }

        if let (Some(green), Some(amber)) = (args.green_max, args.amber_max)
            && amber - green < MIN_THRESHOLD_GAP_DB
        {
            return Err(AppError::Config(format!(
                "Amber threshold ({}) must be at least {} dB above green ({})",
                amber, MIN_THRESHOLD_GAP_DB, green
            )));
        }

        Ok(Config {
            device_name: args.device,
            settings: Settings {
                calibration_db: args.calibration,
                ema_alpha: args.ema_alpha,
            },
            green_max: args.green_max,
            amber_max: args.amber_max,
            schedule_path: resolve_path(args.config, SCHEDULE_FILE)?,
            log_path: resolve_path(args.log_file, LOG_FILE)?,
            autostart: !args.no_autostart,
        })
    }
}

/// Validate the schedule times given on the command line
pub fn validate_schedule_args(args: &ScheduleArgs) -> AppResult<()> {
    for value in [&args.night_start, &args.night_end].into_iter().flatten() {
        minutes_of_day(value)?;
    }
    Ok(())
}

/// Resolve the platform config directory.
///
/// On Windows: `%APPDATA%\quietward\`
/// On macOS:   `~/Library/Application Support/quietward/`
/// On Linux:   `$XDG_CONFIG_HOME/quietward/` or `~/.config/quietward/`
pub fn app_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(|d| PathBuf::from(d).join(APP_DIR))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support").join(APP_DIR))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|d| d.join(APP_DIR))
    }
}

/// Use the explicit path if given, else a file in the config directory
pub fn resolve_path(explicit: Option<PathBuf>, file_name: &str) -> AppResult<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => app_config_dir()
            .map(|d| d.join(file_name))
            .ok_or_else(|| AppError::Config("Could not determine config directory".to_string())),
    }
}

/// JSON file holding the schedule settings
#[derive(Debug, Clone)]
pub struct ScheduleStore {
    path: PathBuf,
}

impl ScheduleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the settings. A missing file gives the defaults; an unreadable
    /// one is logged and also gives the defaults.
    pub fn load(&self) -> ScheduleConfig {
        match self.try_load() {
            Ok(Some(config)) => config,
            Ok(None) => {
                debug!(path = %self.path.display(), "no schedule file, using defaults");
                ScheduleConfig::default()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable schedule file");
                ScheduleConfig::default()
            }
        }
    }

    fn try_load(&self) -> AppResult<Option<ScheduleConfig>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Write the settings, creating the directory if needed
    pub fn save(&self, config: &ScheduleConfig) -> AppResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), "schedule saved");
        Ok(())
    }
}
