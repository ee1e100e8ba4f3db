//! Monitoring session: level estimate, smoothing, classification and stats
//!
//! The monitor owns all per-session state. Each analysis block produces one
//! [`Reading`]; the presentation layer applies it and never reaches back into
//! the session.

use crate::classifier::{Classifier, Status};
use crate::constants::level::{
    CALIBRATION_RANGE, DEFAULT_CALIBRATION_DB, DEFAULT_EMA_ALPHA, EMA_ALPHA_RANGE,
};
use crate::level::{self, Level};
use crate::schedule::ThresholdProfile;
use crate::smoothing::Smoother;
use crate::stats::RollingStats;
use std::time::Instant;
use tracing::{debug, info, trace};

/// Live-adjustable processing settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    /// Offset from dBFS to dB(A)
    pub calibration_db: f32,
    /// EMA weight of the previous value
    pub ema_alpha: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            calibration_db: DEFAULT_CALIBRATION_DB,
            ema_alpha: DEFAULT_EMA_ALPHA,
        }
    }
}

impl Settings {
    pub fn adjust_calibration(&mut self, delta: f32) {
        self.calibration_db =
            (self.calibration_db + delta).clamp(CALIBRATION_RANGE.0, CALIBRATION_RANGE.1);
    }

    pub fn adjust_ema_alpha(&mut self, delta: f32) {
        let alpha = (self.ema_alpha + delta).clamp(EMA_ALPHA_RANGE.0, EMA_ALPHA_RANGE.1);
        // keep two decimals so repeated steps don't drift
        self.ema_alpha = (alpha * 100.0).round() / 100.0;
    }
}

/// Result of processing one block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub level: Level,
    /// Smoothed level in dB(A)
    pub db: f32,
    pub status: Status,
    pub average: Option<f32>,
    pub min_max: Option<(f32, f32)>,
}

/// State that lives from start to stop
#[derive(Debug, Clone)]
struct Session {
    smoother: Smoother,
    classifier: Classifier,
    stats: RollingStats,
}

impl Session {
    fn new(started_at: Instant) -> Self {
        Self {
            smoother: Smoother::new(),
            classifier: Classifier::new(started_at),
            stats: RollingStats::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Monitor {
    settings: Settings,
    session: Option<Session>,
}

impl Monitor {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            session: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Begin a session at `now`; a running session is left untouched
    pub fn start(&mut self, now: Instant) {
        if self.session.is_some() {
            debug!("start ignored, already monitoring");
            return;
        }
        info!(
            calibration_db = self.settings.calibration_db,
            ema_alpha = self.settings.ema_alpha,
            "monitoring started"
        );
        self.session = Some(Session::new(now));
    }

    /// End the session and discard its state
    pub fn stop(&mut self) {
        if self.session.take().is_some() {
            info!("monitoring stopped");
        }
    }

    /// Run one analysis block through the chain. Returns `None` when stopped.
    pub fn process_block(
        &mut self,
        block: &[f32],
        profile: ThresholdProfile,
        now: Instant,
    ) -> Option<Reading> {
        let settings = self.settings;
        let session = self.session.as_mut()?;

        let level = level::estimate(block, settings.calibration_db);
        let db = session.smoother.update(level.instant_db, settings.ema_alpha);
        let status = session.classifier.classify(db, now, profile);
        let summary = session.stats.push(now, db);
        trace!(rms = level.rms, dbfs = level.dbfs, db, %status, "block processed");

        Some(Reading {
            level,
            db,
            status,
            average: summary.average,
            min_max: summary.min_max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::classify::GRACE_MS;
    use std::time::Duration;

    fn block(amplitude: f32) -> Vec<f32> {
        vec![amplitude; 2048]
    }

    #[test]
    fn test_stopped_monitor_produces_nothing() {
        let mut monitor = Monitor::default();
        assert!(!monitor.is_running());
        assert!(
            monitor
                .process_block(&block(0.1), ThresholdProfile::NIGHT, Instant::now())
                .is_none()
        );
    }

    #[test]
    fn test_end_to_end_quiet_then_loud() {
        let mut monitor = Monitor::new(Settings {
            calibration_db: 60.0,
            ema_alpha: 0.8,
        });
        let start = Instant::now();
        monitor.start(start);

        let quiet = monitor
            .process_block(&block(0.001), ThresholdProfile::NIGHT, start)
            .unwrap();
        assert!((quiet.level.dbfs + 60.0).abs() < 1e-3);
        assert!(quiet.level.instant_db.abs() < 1e-3);
        assert_eq!(quiet.status, Status::Green);

        // 0.3 rms -> about -10.5 dBFS -> ~49.5 dB(A), above night amber + h
        let loud = block(0.3);
        let mut now = start + Duration::from_millis(GRACE_MS + 10);
        let mut statuses = Vec::new();
        for _ in 0..40 {
            let reading = monitor
                .process_block(&loud, ThresholdProfile::NIGHT, now)
                .unwrap();
            statuses.push(reading.status);
            now += Duration::from_millis(33);
        }

        let first_amber = statuses.iter().position(|s| *s == Status::Amber).unwrap();
        let first_red = statuses.iter().position(|s| *s == Status::Red).unwrap();
        assert!(first_amber < first_red);
        assert_eq!(*statuses.last().unwrap(), Status::Red);
    }

    #[test]
    fn test_grace_period_holds_green() {
        let mut monitor = Monitor::default();
        let start = Instant::now();
        monitor.start(start);
        // ~46.5 dB(A): above night amber, below amber + 2
        let reading = monitor
            .process_block(&block(0.21), ThresholdProfile::NIGHT, start + Duration::from_millis(100))
            .unwrap();
        assert_eq!(reading.status, Status::Green);
    }

    #[test]
    fn test_stop_clears_session() {
        let mut monitor = Monitor::default();
        let start = Instant::now();
        monitor.start(start);
        monitor.process_block(&block(0.5), ThresholdProfile::NIGHT, start);
        monitor.stop();
        assert!(!monitor.is_running());

        let restart = start + Duration::from_secs(10);
        monitor.start(restart);
        let reading = monitor
            .process_block(&block(0.001), ThresholdProfile::NIGHT, restart)
            .unwrap();
        // Fresh smoother: no carry-over from the loud block
        assert!((reading.db - reading.level.instant_db).abs() < 1e-6);
        assert_eq!(reading.average, Some(reading.db));
    }

    #[test]
    fn test_settings_are_read_live() {
        let mut monitor = Monitor::default();
        let start = Instant::now();
        monitor.start(start);
        let a = monitor
            .process_block(&block(0.01), ThresholdProfile::DAY, start)
            .unwrap();
        monitor.settings_mut().adjust_calibration(10.0);
        monitor.settings_mut().ema_alpha = 0.0;
        let b = monitor
            .process_block(&block(0.01), ThresholdProfile::DAY, start)
            .unwrap();
        assert!((b.db - a.db - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_settings_adjustment_is_clamped() {
        let mut settings = Settings::default();
        settings.adjust_ema_alpha(0.5);
        assert_eq!(settings.ema_alpha, EMA_ALPHA_RANGE.1);
        settings.adjust_calibration(-1000.0);
        assert_eq!(settings.calibration_db, CALIBRATION_RANGE.0);
    }
}
