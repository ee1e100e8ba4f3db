//! Trailing 5-minute average and min/max of the smoothed level

use crate::constants::stats::WINDOW_MS;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    t: Instant,
    v: f32,
}

/// Figures reported after each update
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Summary {
    /// Mean over the window, `None` when empty
    pub average: Option<f32>,
    /// `(min, max)` over the window, `None` when empty
    pub min_max: Option<(f32, f32)>,
}

/// Rolling statistics over the smoothed signal.
///
/// The averaging and peaks windows share one retention policy, so they always
/// hold the same samples.
#[derive(Debug, Clone)]
pub struct RollingStats {
    window: Duration,
    averages: VecDeque<Sample>,
    peaks: VecDeque<Sample>,
}

impl Default for RollingStats {
    fn default() -> Self {
        Self::new(Duration::from_millis(WINDOW_MS))
    }
}

impl RollingStats {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            averages: VecDeque::new(),
            peaks: VecDeque::new(),
        }
    }

    /// Append a reading, prune both windows and report
    pub fn push(&mut self, now: Instant, db: f32) -> Summary {
        let sample = Sample { t: now, v: db };
        self.averages.push_back(sample);
        self.peaks.push_back(sample);
        self.prune(now);
        self.summary()
    }

    /// Drop every sample older than `now - window`
    pub fn prune(&mut self, now: Instant) {
        let window = self.window;
        let expired = |s: &Sample| now.saturating_duration_since(s.t) > window;
        while self.averages.front().is_some_and(expired) {
            self.averages.pop_front();
        }
        while self.peaks.front().is_some_and(expired) {
            self.peaks.pop_front();
        }
    }

    pub fn summary(&self) -> Summary {
        Summary {
            average: self.average(),
            min_max: self.min_max(),
        }
    }

    pub fn average(&self) -> Option<f32> {
        if self.averages.is_empty() {
            return None;
        }
        let sum: f64 = self.averages.iter().map(|s| s.v as f64).sum();
        Some((sum / self.averages.len() as f64) as f32)
    }

    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.peaks.iter().fold(None, |acc, s| match acc {
            None => Some((s.v, s.v)),
            Some((lo, hi)) => Some((lo.min(s.v), hi.max(s.v))),
        })
    }

    /// Oldest retained timestamp across both windows
    #[cfg(test)]
    pub fn oldest(&self) -> Option<Instant> {
        let a = self.averages.front().map(|s| s.t);
        let p = self.peaks.front().map(|s| s.t);
        match (a, p) {
            (Some(a), Some(p)) => Some(a.min(p)),
            (a, p) => a.or(p),
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.averages.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.averages.is_empty()
    }

    #[cfg(test)]
    pub fn clear(&mut self) {
        self.averages.clear();
        self.peaks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_reports_unavailable() {
        let stats = RollingStats::default();
        assert_eq!(stats.summary(), Summary::default());
        assert!(stats.is_empty());
    }

    #[test]
    fn test_average_and_peaks() {
        let mut stats = RollingStats::default();
        let t0 = Instant::now();
        stats.push(t0, 40.0);
        stats.push(t0 + Duration::from_secs(1), 50.0);
        let summary = stats.push(t0 + Duration::from_secs(2), 45.0);

        assert_eq!(summary.average, Some(45.0));
        assert_eq!(summary.min_max, Some((40.0, 50.0)));
    }

    #[test]
    fn test_prune_drops_samples_older_than_window() {
        let mut stats = RollingStats::default();
        let t0 = Instant::now();
        for i in 0..700u64 {
            stats.push(t0 + Duration::from_secs(i), i as f32);
        }
        let now = t0 + Duration::from_secs(699);
        let cutoff = now - Duration::from_millis(WINDOW_MS);
        assert!(stats.oldest().unwrap() >= cutoff);
        // 399..=699 inclusive of the boundary sample
        assert_eq!(stats.len(), 301);
        assert_eq!(stats.min_max(), Some((399.0, 699.0)));
    }

    #[test]
    fn test_both_windows_agree() {
        let mut stats = RollingStats::new(Duration::from_secs(10));
        let t0 = Instant::now();
        for i in 0..30u64 {
            stats.push(t0 + Duration::from_secs(i), (i % 7) as f32);
        }
        assert_eq!(stats.averages, stats.peaks);
    }

    #[test]
    fn test_clear() {
        let mut stats = RollingStats::default();
        stats.push(Instant::now(), 30.0);
        stats.clear();
        assert_eq!(stats.summary(), Summary::default());
    }
}
