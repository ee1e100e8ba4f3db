//! Exponential smoothing of successive level estimates

/// Exponential moving average over instantaneous dB readings.
///
/// `alpha` is the weight given to the previous smoothed value, so a higher
/// alpha responds more slowly.
#[derive(Debug, Clone, Default)]
pub struct Smoother {
    value: Option<f32>,
}

impl Smoother {
    /// Create an uninitialised smoother
    pub fn new() -> Self {
        Self { value: None }
    }

    /// Feed one reading and return the smoothed value.
    /// The first reading seeds the average.
    pub fn update(&mut self, instant_db: f32, alpha: f32) -> f32 {
        let next = match self.value {
            None => instant_db,
            Some(prev) => prev * alpha + instant_db * (1.0 - alpha),
        };
        self.value = Some(next);
        next
    }

    /// Get the current smoothed value, if any reading has been seen
    #[cfg(test)]
    pub fn value(&self) -> Option<f32> {
        self.value
    }

    /// Forget all history
    #[cfg(test)]
    pub fn reset(&mut self) {
        self.value = None;
    }
}
