//! Application constants and configuration values

/// Audio capture constants
pub mod audio {
    /// Buffer size for audio streams
    pub const BUFFER_SIZE: cpal::BufferSize = cpal::BufferSize::Default;
    /// Preferred capture rate; matches the first weighting table
    pub const PREFERRED_SAMPLE_RATE: u32 = 44_100;
    /// Number of most recent filtered samples analysed per frame
    pub const ANALYSIS_WINDOW: usize = 2048;
}

/// Level estimation and smoothing defaults
pub mod level {
    /// Default calibration offset from dBFS to dB(A)
    pub const DEFAULT_CALIBRATION_DB: f32 = 60.0;
    /// Calibration adjustment range
    pub const CALIBRATION_RANGE: (f32, f32) = (0.0, 120.0);
    /// Default EMA weight given to the previous smoothed value
    pub const DEFAULT_EMA_ALPHA: f32 = 0.80;
    /// EMA weight adjustment range (open interval kept away from 0 and 1)
    pub const EMA_ALPHA_RANGE: (f32, f32) = (0.01, 0.99);
    /// Floor added to the RMS before taking the log
    pub const RMS_EPSILON: f64 = 1e-12;
}

/// Classification constants
pub mod classify {
    /// Hysteresis margin in dB
    pub const HYSTERESIS_DB: f32 = 1.0;
    /// Start-up grace window in milliseconds
    pub const GRACE_MS: u64 = 2000;
    /// Margin above amber during grace that still reports amber
    pub const GRACE_AMBER_MARGIN_DB: f32 = 2.0;
    /// Minimum gap kept between green and amber thresholds
    pub const MIN_THRESHOLD_GAP_DB: f32 = 1.0;
    /// Threshold adjustment range
    pub const THRESHOLD_RANGE: (f32, f32) = (20.0, 90.0);
}

/// Rolling statistics constants
pub mod stats {
    /// Lookback of the trailing average and peak windows in milliseconds
    pub const WINDOW_MS: u64 = 300_000;
}

/// Day/night schedule constants
pub mod schedule {
    /// Scheduler evaluation interval in seconds
    pub const TICK_INTERVAL_SECS: u64 = 30;
    /// Default night window start
    pub const DEFAULT_NIGHT_START: &str = "22:00";
    /// Default night window end
    pub const DEFAULT_NIGHT_END: &str = "07:00";
}

/// UI display constants
pub mod ui {
    /// Frame interval in milliseconds (~30 fps)
    pub const FRAME_INTERVAL_MS: u64 = 33;
    /// Bar width calculation accounts for borders
    pub const BAR_BORDER_WIDTH: usize = 2;
    /// Upper end of the gauge in dB(A); the lower end is 0
    pub const GAUGE_MAX_DB: f32 = 80.0;
}

/// Files written under the config directory
pub mod files {
    /// Directory name under the platform config dir
    pub const APP_DIR: &str = "quietward";
    /// Persisted schedule settings
    pub const SCHEDULE_FILE: &str = "schedule.json";
    /// Log file used while the terminal UI is active
    pub const LOG_FILE: &str = "quietward.log";
}
