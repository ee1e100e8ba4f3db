//! Green/amber/red classification with hysteresis and a start-up grace window

use crate::constants::classify::{GRACE_AMBER_MARGIN_DB, GRACE_MS, HYSTERESIS_DB};
use crate::schedule::ThresholdProfile;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// Noise status shown to the ward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Green,
    Amber,
    Red,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Green => "Green",
            Status::Amber => "Amber",
            Status::Red => "Red",
        }
    }

    /// One-line explanation of what the level means for patients
    pub fn legend(&self) -> &'static str {
        match self {
            Status::Green => "Low noise: suitable for rest and conversation.",
            Status::Amber => "Moderate noise: may disturb rest or concentration.",
            Status::Red => "High noise: clear risk of disturbance or acoustic stress.",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Next status for a smoothed reading.
///
/// Inside the grace window the status is green unless the room is clearly
/// louder than amber. After it, leaving a state needs `hysteresis` dB more
/// swing than entering it.
pub fn next_status(
    db: f32,
    elapsed: Duration,
    last: Status,
    profile: ThresholdProfile,
    hysteresis: f32,
) -> Status {
    let ThresholdProfile { green_max, amber_max } = profile;
    let h = hysteresis;

    if elapsed < Duration::from_millis(GRACE_MS) {
        return if db > amber_max + GRACE_AMBER_MARGIN_DB {
            Status::Amber
        } else {
            Status::Green
        };
    }

    match last {
        Status::Green => {
            if db <= green_max + h {
                Status::Green
            } else if db <= amber_max + h {
                Status::Amber
            } else {
                Status::Red
            }
        }
        Status::Amber => {
            if db < green_max - h {
                Status::Green
            } else if db <= amber_max + h {
                Status::Amber
            } else {
                Status::Red
            }
        }
        Status::Red => {
            if db > amber_max - h {
                Status::Red
            } else if db > green_max + h {
                Status::Amber
            } else {
                Status::Green
            }
        }
    }
}

/// Per-session classifier state
#[derive(Debug, Clone)]
pub struct Classifier {
    started_at: Instant,
    last: Status,
    hysteresis: f32,
}

impl Classifier {
    /// Start a session at `started_at` in the green state
    pub fn new(started_at: Instant) -> Self {
        Self {
            started_at,
            last: Status::Green,
            hysteresis: HYSTERESIS_DB,
        }
    }

    /// Classify a smoothed reading and remember the result
    pub fn classify(&mut self, db: f32, now: Instant, profile: ThresholdProfile) -> Status {
        let elapsed = now.saturating_duration_since(self.started_at);
        let status = next_status(db, elapsed, self.last, profile, self.hysteresis);
        if status != self.last {
            debug!(from = %self.last, to = %status, db, "status changed");
        }
        self.last = status;
        status
    }

    #[cfg(test)]
    pub fn last_status(&self) -> Status {
        self.last
    }

    #[cfg(test)]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }
}
