//! Block level estimation: RMS, dBFS and calibrated dB(A)

use crate::constants::level::RMS_EPSILON;

/// Level of one analysis block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Level {
    /// Linear RMS of the block
    pub rms: f32,
    /// RMS relative to full scale
    pub dbfs: f32,
    /// `dbfs` plus the calibration offset
    pub instant_db: f32,
}

/// Root mean square of a block; an empty block reads as silence
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

/// Convert a linear RMS to dBFS with a floor so silence stays finite
pub fn rms_to_dbfs(rms: f32) -> f32 {
    (20.0 * (rms as f64 + RMS_EPSILON).log10()) as f32
}

/// Estimate the calibrated level of an already weighted block.
///
/// The calibration is passed per call since it can change between frames.
pub fn estimate(samples: &[f32], calibration_db: f32) -> Level {
    let rms = rms(samples);
    let dbfs = rms_to_dbfs(rms);
    Level {
        rms,
        dbfs,
        instant_db: dbfs + calibration_db,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_block() {
        let block = vec![0.001f32; 2048];
        let level = estimate(&block, 60.0);
        assert!((level.rms - 0.001).abs() < 1e-7);
        assert!((level.dbfs + 60.0).abs() < 1e-3);
        assert!(level.instant_db.abs() < 1e-3);
    }

    #[test]
    fn test_full_scale_square_wave_is_zero_dbfs() {
        let block: Vec<f32> = (0..1024).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!(estimate(&block, 0.0).dbfs.abs() < 1e-4);
    }

    #[test]
    fn test_silence_stays_finite() {
        let level = estimate(&[0.0; 2048], 60.0);
        assert_eq!(level.rms, 0.0);
        assert!((level.dbfs + 240.0).abs() < 1e-3);
        assert!(level.instant_db.is_finite());

        let empty = estimate(&[], 60.0);
        assert!(empty.dbfs.is_finite());
    }

    #[test]
    fn test_calibration_applies_per_call() {
        let block = vec![0.01f32; 256];
        let a = estimate(&block, 60.0);
        let b = estimate(&block, 70.0);
        assert!((b.instant_db - a.instant_db - 10.0).abs() < 1e-4);
    }
}
