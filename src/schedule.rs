//! Day/night threshold profiles and the automatic schedule that picks one

use crate::constants::classify::{MIN_THRESHOLD_GAP_DB, THRESHOLD_RANGE};
use crate::constants::schedule::{DEFAULT_NIGHT_END, DEFAULT_NIGHT_START};
use crate::error::{AppError, AppResult};
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Upper bounds of the green and amber bands in dB(A)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdProfile {
    pub green_max: f32,
    pub amber_max: f32,
}

impl ThresholdProfile {
    pub const DAY: ThresholdProfile = ThresholdProfile {
        green_max: 45.0,
        amber_max: 55.0,
    };
    pub const NIGHT: ThresholdProfile = ThresholdProfile {
        green_max: 35.0,
        amber_max: 45.0,
    };
}

/// Which default profile applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Day,
    Night,
}

impl Mode {
    pub fn default_profile(&self) -> ThresholdProfile {
        match self {
            Mode::Day => ThresholdProfile::DAY,
            Mode::Night => ThresholdProfile::NIGHT,
        }
    }

    pub fn toggled(&self) -> Mode {
        match self {
            Mode::Day => Mode::Night,
            Mode::Night => Mode::Day,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Mode::Day => "☀",
            Mode::Night => "☾",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Day => f.write_str("Day"),
            Mode::Night => f.write_str("Night"),
        }
    }
}

/// Active mode and thresholds.
///
/// Once the user edits a threshold the edited values stick: switching mode
/// afterwards only changes the label.
#[derive(Debug, Clone)]
pub struct Thresholds {
    mode: Mode,
    profile: ThresholdProfile,
    user_tweaked: bool,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            mode: Mode::Night,
            profile: ThresholdProfile::NIGHT,
            user_tweaked: false,
        }
    }
}

impl Thresholds {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn profile(&self) -> ThresholdProfile {
        self.profile
    }

    #[cfg(test)]
    pub fn user_tweaked(&self) -> bool {
        self.user_tweaked
    }

    /// Switch mode, applying its defaults unless the user has edited thresholds
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        if !self.user_tweaked {
            self.profile = mode.default_profile();
        }
    }

    /// Set the green upper bound, kept at least 1 dB under amber
    pub fn set_green_max(&mut self, db: f32) {
        self.user_tweaked = true;
        let db = db.clamp(THRESHOLD_RANGE.0, THRESHOLD_RANGE.1);
        self.profile.green_max = db.min(self.profile.amber_max - MIN_THRESHOLD_GAP_DB);
    }

    /// Set the amber upper bound, kept at least 1 dB over green
    pub fn set_amber_max(&mut self, db: f32) {
        self.user_tweaked = true;
        let db = db.clamp(THRESHOLD_RANGE.0, THRESHOLD_RANGE.1);
        self.profile.amber_max = db.max(self.profile.green_max + MIN_THRESHOLD_GAP_DB);
    }

    /// Set both bounds at once. Amber is taken as given (within range) and
    /// green is pulled down if it would sit closer than 1 dB to it.
    pub fn set_profile(&mut self, profile: ThresholdProfile) {
        self.user_tweaked = true;
        let amber_max = profile
            .amber_max
            .clamp(THRESHOLD_RANGE.0 + MIN_THRESHOLD_GAP_DB, THRESHOLD_RANGE.1);
        let green_max = profile
            .green_max
            .clamp(THRESHOLD_RANGE.0, THRESHOLD_RANGE.1)
            .min(amber_max - MIN_THRESHOLD_GAP_DB);
        self.profile = ThresholdProfile { green_max, amber_max };
    }

    /// Apply command-line overrides on top of the current profile. An
    /// explicit value wins over the bound it would otherwise collide with.
    pub fn apply_overrides(&mut self, green_max: Option<f32>, amber_max: Option<f32>) {
        let current = self.profile;
        let profile = match (green_max, amber_max) {
            (None, None) => return,
            (Some(green_max), Some(amber_max)) => ThresholdProfile { green_max, amber_max },
            (Some(green_max), None) => ThresholdProfile {
                green_max,
                amber_max: current.amber_max.max(green_max + MIN_THRESHOLD_GAP_DB),
            },
            (None, Some(amber_max)) => ThresholdProfile {
                green_max: current.green_max.min(amber_max - MIN_THRESHOLD_GAP_DB),
                amber_max,
            },
        };
        self.set_profile(profile);
    }

    pub fn adjust_green_max(&mut self, delta: f32) {
        self.set_green_max(self.profile.green_max + delta);
    }

    pub fn adjust_amber_max(&mut self, delta: f32) {
        self.set_amber_max(self.profile.amber_max + delta);
    }
}

/// Parse an `HH:MM` string into minutes after midnight
pub fn minutes_of_day(hhmm: &str) -> AppResult<u32> {
    let time = NaiveTime::parse_from_str(hhmm.trim(), "%H:%M")
        .map_err(|e| AppError::Config(format!("Invalid time '{}', expected HH:MM: {}", hhmm, e)))?;
    Ok(minute_of(time))
}

/// Minutes after midnight for a wall-clock time
pub fn minute_of(time: NaiveTime) -> u32 {
    (time.hour() * 60 + time.minute()) % MINUTES_PER_DAY
}

/// Night window `[start, end)` in minutes after midnight; may wrap midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NightWindow {
    pub start: u32,
    pub end: u32,
}

impl NightWindow {
    pub fn parse(start: &str, end: &str) -> AppResult<Self> {
        Ok(Self {
            start: minutes_of_day(start)?,
            end: minutes_of_day(end)?,
        })
    }

    /// Whether a minute of the day falls in the window.
    /// An empty window (`start == end`) never matches.
    pub fn contains(&self, minute: u32) -> bool {
        let minute = minute % MINUTES_PER_DAY;
        if self.start == self.end {
            false
        } else if self.start < self.end {
            minute >= self.start && minute < self.end
        } else {
            minute >= self.start || minute < self.end
        }
    }
}

/// Persisted schedule settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleConfig {
    pub auto_mode: bool,
    pub night_start: String,
    pub night_end: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            auto_mode: true,
            night_start: DEFAULT_NIGHT_START.to_string(),
            night_end: DEFAULT_NIGHT_END.to_string(),
        }
    }
}

impl ScheduleConfig {
    pub fn window(&self) -> AppResult<NightWindow> {
        NightWindow::parse(&self.night_start, &self.night_end)
    }

    /// Replace unparseable times with the defaults
    pub fn sanitized(mut self) -> Self {
        if minutes_of_day(&self.night_start).is_err() {
            warn!(night_start = %self.night_start, "invalid night start, using default");
            self.night_start = DEFAULT_NIGHT_START.to_string();
        }
        if minutes_of_day(&self.night_end).is_err() {
            warn!(night_end = %self.night_end, "invalid night end, using default");
            self.night_end = DEFAULT_NIGHT_END.to_string();
        }
        self
    }
}

/// Automatic day/night switching.
///
/// A manual mode toggle turns auto mode off and blocks further automatic
/// switching until auto mode is enabled again.
#[derive(Debug, Clone)]
pub struct Scheduler {
    config: ScheduleConfig,
    manual_override: bool,
}

impl Scheduler {
    pub fn new(config: ScheduleConfig) -> Self {
        Self {
            config: config.sanitized(),
            manual_override: false,
        }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    #[cfg(test)]
    pub fn manual_override(&self) -> bool {
        self.manual_override
    }

    /// Whether automatic switching is currently in effect
    pub fn is_active(&self) -> bool {
        self.config.auto_mode && !self.manual_override
    }

    /// Mode the window selects for a given time
    pub fn mode_at(&self, now: NaiveTime) -> AppResult<Mode> {
        let window = self.config.window()?;
        Ok(if window.contains(minute_of(now)) {
            Mode::Night
        } else {
            Mode::Day
        })
    }

    /// Periodic evaluation. Returns the mode applied, or `None` when
    /// automatic switching is off.
    pub fn tick(&self, now: NaiveTime, thresholds: &mut Thresholds) -> Option<Mode> {
        if !self.is_active() {
            return None;
        }
        match self.mode_at(now) {
            Ok(mode) => {
                if mode != thresholds.mode() {
                    info!(%mode, "schedule switched mode");
                }
                thresholds.set_mode(mode);
                Some(mode)
            }
            Err(e) => {
                warn!(error = %e, "schedule evaluation skipped");
                None
            }
        }
    }

    /// Manual mode toggle from the user
    pub fn toggle_mode(&mut self, thresholds: &mut Thresholds) -> Mode {
        if self.config.auto_mode {
            self.manual_override = true;
            self.config.auto_mode = false;
            info!("manual mode toggle, auto mode disabled");
        }
        let mode = thresholds.mode().toggled();
        thresholds.set_mode(mode);
        mode
    }

    /// Enable or disable automatic switching, evaluating immediately when enabled
    pub fn set_auto(&mut self, enabled: bool, now: NaiveTime, thresholds: &mut Thresholds) {
        self.config.auto_mode = enabled;
        self.manual_override = !enabled;
        if enabled {
            self.tick(now, thresholds);
        }
    }

    /// Change the night window start; an empty value restores the default
    pub fn set_night_start(
        &mut self,
        hhmm: &str,
        now: NaiveTime,
        thresholds: &mut Thresholds,
    ) -> AppResult<()> {
        let value = if hhmm.trim().is_empty() { DEFAULT_NIGHT_START } else { hhmm.trim() };
        minutes_of_day(value)?;
        self.config.night_start = value.to_string();
        self.tick(now, thresholds);
        Ok(())
    }

    /// Change the night window end; an empty value restores the default
    pub fn set_night_end(
        &mut self,
        hhmm: &str,
        now: NaiveTime,
        thresholds: &mut Thresholds,
    ) -> AppResult<()> {
        let value = if hhmm.trim().is_empty() { DEFAULT_NIGHT_END } else { hhmm.trim() };
        minutes_of_day(value)?;
        self.config.night_end = value.to_string();
        self.tick(now, thresholds);
        Ok(())
    }
}
