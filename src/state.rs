//! Application state management

use crate::classifier::Status;
use crate::monitor::Reading;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Fixed-size window of the most recent filtered samples.
///
/// Reads before the window fills see leading zeros.
#[derive(Debug, Clone)]
pub struct AnalysisBuffer {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl AnalysisBuffer {
    pub fn new(capacity: usize) -> Self {
        let mut samples = VecDeque::with_capacity(capacity);
        samples.resize(capacity, 0.0);
        Self { samples, capacity }
    }

    /// Append samples, discarding the oldest beyond capacity
    pub fn extend(&mut self, samples: impl IntoIterator<Item = f32>) {
        for sample in samples {
            if self.samples.len() == self.capacity {
                self.samples.pop_front();
            }
            self.samples.push_back(sample);
        }
    }

    /// Copy the window, oldest first, into `out`
    pub fn copy_into(&self, out: &mut Vec<f32>) {
        out.clear();
        out.extend(self.samples.iter().copied());
    }

    pub fn clear(&mut self) {
        self.samples.iter_mut().for_each(|s| *s = 0.0);
    }
}

/// Thread-safe state shared with the audio callback
#[derive(Clone)]
pub struct SharedState {
    pub analysis: Arc<Mutex<AnalysisBuffer>>,
    pub stream_error: Arc<Mutex<Option<String>>>,
}

impl SharedState {
    /// Create new shared state with an empty analysis window
    pub fn new(window: usize) -> Self {
        Self {
            analysis: Arc::new(Mutex::new(AnalysisBuffer::new(window))),
            stream_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Snapshot the latest window; a poisoned lock reads as silence
    pub fn snapshot(&self, out: &mut Vec<f32>) {
        match self.analysis.lock() {
            Ok(buffer) => buffer.copy_into(out),
            Err(_) => out.clear(),
        }
    }

    /// Take the last stream error reported by the callback, if any
    pub fn take_stream_error(&self) -> Option<String> {
        self.stream_error.lock().ok().and_then(|mut e| e.take())
    }

    pub fn reset(&self) {
        if let Ok(mut buffer) = self.analysis.lock() {
            buffer.clear();
        }
    }
}

/// Banner severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
}

/// Presentation state updated from monitor readings
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub device_name: Option<String>,
    pub reading: Option<Reading>,
    pub banner: Option<Banner>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_reading(&mut self, reading: Reading) {
        self.reading = Some(reading);
    }

    /// Status to paint; green when idle
    pub fn status(&self) -> Status {
        self.reading.map(|r| r.status).unwrap_or_default()
    }

    pub fn set_banner(&mut self, kind: BannerKind, message: impl Into<String>) {
        self.banner = Some(Banner {
            kind,
            message: message.into(),
        });
    }

    /// Forget the last session's figures
    pub fn clear_session(&mut self) {
        self.reading = None;
        self.device_name = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_starts_zeroed_and_keeps_latest() {
        let mut buffer = AnalysisBuffer::new(4);
        let mut out = Vec::new();
        buffer.copy_into(&mut out);
        assert_eq!(out, vec![0.0; 4]);

        buffer.extend([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        buffer.copy_into(&mut out);
        assert_eq!(out, vec![3.0, 4.0, 5.0, 6.0]);

        buffer.clear();
        buffer.copy_into(&mut out);
        assert_eq!(out, vec![0.0; 4]);
    }

    #[test]
    fn test_shared_state_stream_error_is_taken_once() {
        let shared = SharedState::new(8);
        *shared.stream_error.lock().unwrap() = Some("device unplugged".to_string());
        assert_eq!(shared.take_stream_error().as_deref(), Some("device unplugged"));
        assert_eq!(shared.take_stream_error(), None);
    }

    #[test]
    fn test_idle_status_is_green() {
        let state = AppState::new();
        assert_eq!(state.status(), Status::Green);
    }
}
