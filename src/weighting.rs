//! A-weighting filter built from three cascaded biquad sections
//!
//! Only two coefficient tables exist (44.1 kHz and 48 kHz). Any other rate
//! reuses the 44.1 kHz table, which shifts the curve in frequency: the result
//! is an approximation, not a resampled design.

use tracing::{debug, warn};

/// Coefficients of one second-order section, `a0` normalised to 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

/// One direct-form biquad with persistent delay lines
#[derive(Debug, Clone)]
pub struct Biquad {
    coeffs: BiquadCoefficients,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    pub fn new(coeffs: BiquadCoefficients) -> Self {
        Self {
            coeffs,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Filter a single sample
    #[inline]
    pub fn process(&mut self, x: f64) -> f64 {
        let c = &self.coeffs;
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }

    #[cfg(test)]
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

const fn section(b0: f64, b1: f64, b2: f64, a1: f64, a2: f64) -> BiquadCoefficients {
    BiquadCoefficients { b0, b1, b2, a1, a2 }
}

const TABLE_44100: [BiquadCoefficients; 3] = [
    section(0.95616638497, -1.31960414122, 0.36343775625, -1.31861375911, 0.32059452332),
    section(0.94317138580, -1.88634277160, 0.94317138580, -1.88558607420, 0.88709946900),
    section(0.69736775447, -0.42552769920, -0.27184005527, -1.31859445445, 0.32058831623),
];

const TABLE_48000: [BiquadCoefficients; 3] = [
    section(0.96525096525, -1.34730163086, 0.38205066561, -1.34730722798, 0.34905752979),
    section(0.94696969696, -1.89393939393, 0.94696969696, -1.89387049481, 0.89515976917),
    section(0.64666542810, -0.38362237137, -0.26304305672, -1.34730722798, 0.34905752979),
];

/// Which coefficient table a filter runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoefficientTable {
    Hz44100,
    Hz48000,
    /// No table for the requested rate; the 44.1 kHz table stands in
    Fallback { requested: u32 },
}

impl CoefficientTable {
    /// Pick the table for a sample rate
    pub fn for_sample_rate(sample_rate: f64) -> Self {
        let fs = sample_rate.round();
        if (fs - 44_100.0).abs() < 200.0 {
            CoefficientTable::Hz44100
        } else if (fs - 48_000.0).abs() < 400.0 {
            CoefficientTable::Hz48000
        } else {
            CoefficientTable::Fallback {
                requested: fs.max(0.0) as u32,
            }
        }
    }

    pub fn sections(&self) -> &'static [BiquadCoefficients; 3] {
        match self {
            CoefficientTable::Hz48000 => &TABLE_48000,
            CoefficientTable::Hz44100 | CoefficientTable::Fallback { .. } => &TABLE_44100,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, CoefficientTable::Fallback { .. })
    }
}

/// Streaming A-weighting filter
#[derive(Debug, Clone)]
pub struct AWeighting {
    table: CoefficientTable,
    stages: [Biquad; 3],
}

impl AWeighting {
    /// Build the cascade for the given sample rate, logging when the rate
    /// has no dedicated table
    pub fn new(sample_rate: u32) -> Self {
        let table = CoefficientTable::for_sample_rate(sample_rate as f64);
        if table.is_fallback() {
            warn!(
                sample_rate,
                "no A-weighting table for this sample rate; using the 44.1 kHz table as an approximation"
            );
        } else {
            debug!(sample_rate, ?table, "A-weighting table selected");
        }

        let [s1, s2, s3] = *table.sections();
        Self {
            table,
            stages: [Biquad::new(s1), Biquad::new(s2), Biquad::new(s3)],
        }
    }

    pub fn table(&self) -> CoefficientTable {
        self.table
    }

    /// Pass one sample through all three sections
    #[inline]
    pub fn process_sample(&mut self, sample: f32) -> f32 {
        let mut y = sample as f64;
        for stage in self.stages.iter_mut() {
            y = stage.process(y);
        }
        y as f32
    }

    /// Filter a block in place; state carries over to the next call
    #[cfg(test)]
    pub fn process(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    #[cfg(test)]
    pub fn reset(&mut self) {
        for stage in self.stages.iter_mut() {
            stage.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Collects formatted log output so tests can look at it
    #[derive(Clone, Default)]
    struct LogCapture(Arc<Mutex<Vec<u8>>>);

    impl LogCapture {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
        type Writer = LogCapture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Build a filter with a capturing subscriber installed; returns the log text
    fn build_logged(sample_rate: u32) -> (AWeighting, String) {
        let capture = LogCapture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let filter = tracing::subscriber::with_default(subscriber, || AWeighting::new(sample_rate));
        (filter, capture.contents())
    }

    fn sine(freq: f64, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                (2.0 * std::f64::consts::PI * freq * t).sin() as f32
            })
            .collect()
    }

    fn rms(samples: &[f32]) -> f64 {
        (samples.iter().map(|s| (*s as f64).powi(2)).sum::<f64>() / samples.len() as f64).sqrt()
    }

    /// Gain in dB after the filter has settled (first half discarded)
    fn settled_gain_db(freq: f64, sample_rate: u32) -> f64 {
        let input = sine(freq, sample_rate, sample_rate as usize);
        let mut output = input.clone();
        AWeighting::new(sample_rate).process(&mut output);
        let half = input.len() / 2;
        20.0 * (rms(&output[half..]) / rms(&input[half..])).log10()
    }

    #[test]
    fn test_table_selection() {
        assert_eq!(CoefficientTable::for_sample_rate(44_100.0), CoefficientTable::Hz44100);
        assert_eq!(CoefficientTable::for_sample_rate(44_250.0), CoefficientTable::Hz44100);
        assert_eq!(CoefficientTable::for_sample_rate(48_000.0), CoefficientTable::Hz48000);
        assert_eq!(CoefficientTable::for_sample_rate(47_700.0), CoefficientTable::Hz48000);
        assert_eq!(
            CoefficientTable::for_sample_rate(96_000.0),
            CoefficientTable::Fallback { requested: 96_000 }
        );
    }

    #[test]
    fn test_unsupported_rate_falls_back_to_44100_table() {
        let (filter, logs) = build_logged(16_000);
        assert!(filter.table().is_fallback());
        assert!(logs.contains("WARN"), "expected a warning, got: {logs:?}");
        assert!(logs.contains("no A-weighting table"));
        assert!(logs.contains("sample_rate=16000"));
        assert_eq!(filter.table().sections(), &TABLE_44100);

        let mut block = sine(1_000.0, 16_000, 512);
        AWeighting::new(16_000).process(&mut block);
        assert!(block.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_supported_rate_logs_no_warning() {
        for rate in [44_100, 48_000] {
            let (filter, logs) = build_logged(rate);
            assert!(!filter.table().is_fallback());
            assert!(logs.is_empty(), "unexpected log output at {rate} Hz: {logs:?}");
        }
    }

    #[test]
    fn test_1khz_is_near_unity() {
        for rate in [44_100, 48_000] {
            let gain = settled_gain_db(1_000.0, rate);
            assert!(gain.abs() < 0.5, "1 kHz gain at {rate} Hz was {gain:.2} dB");
        }
    }

    #[test]
    fn test_low_frequencies_are_attenuated() {
        let gain = settled_gain_db(50.0, 48_000);
        assert!(gain < -25.0, "50 Hz should be strongly attenuated, got {gain:.2} dB");

        let gain = settled_gain_db(100.0, 44_100);
        assert!(gain < -15.0 && gain > -23.0, "100 Hz gain was {gain:.2} dB");
    }

    #[test]
    fn test_dc_is_blocked() {
        let mut block = vec![0.5f32; 48_000];
        AWeighting::new(48_000).process(&mut block);
        assert!(block[47_999].abs() < 1e-3);
    }

    #[test]
    fn test_streaming_matches_single_pass() {
        let input = sine(440.0, 44_100, 4096);

        let mut whole = input.clone();
        AWeighting::new(44_100).process(&mut whole);

        let mut filter = AWeighting::new(44_100);
        let mut chunked = input.clone();
        for chunk in chunked.chunks_mut(300) {
            filter.process(chunk);
        }

        assert_eq!(whole, chunked);
    }

    #[test]
    fn test_reset_clears_delay_lines() {
        let mut filter = AWeighting::new(44_100);
        let mut block = sine(440.0, 44_100, 256);
        filter.process(&mut block);
        filter.reset();

        let mut fresh = AWeighting::new(44_100);
        assert_eq!(filter.process_sample(0.25), fresh.process_sample(0.25));
    }
}
