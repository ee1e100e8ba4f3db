//! Audio device handling and stream processing

use crate::constants::audio::PREFERRED_SAMPLE_RATE;
use crate::error::{AppError, AppResult};
use crate::state::{AnalysisBuffer, SharedState};
use crate::weighting::AWeighting;
use cpal::traits::{DeviceTrait, HostTrait};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

/// Rates with a dedicated weighting table, in order of preference
const TABLE_RATES: [u32; 2] = [PREFERRED_SAMPLE_RATE, 48_000];

/// Audio configuration and device information
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub device_name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Names of all input devices on the default host
pub fn input_device_names() -> AppResult<Vec<String>> {
    let host = cpal::default_host();
    Ok(host.input_devices()?.filter_map(|d| d.name().ok()).collect())
}

/// Find and configure an audio input device
pub fn setup_audio_device(device_name: Option<&str>) -> AppResult<(cpal::Device, AudioConfig)> {
    let host = cpal::default_host();

    let device = if let Some(name) = device_name {
        host.input_devices()?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| AppError::DeviceNotFound(format!("No input device named '{}'", name)))?
    } else {
        host.default_input_device()
            .ok_or_else(|| AppError::DeviceNotFound("No default input device available".to_string()))?
    };

    let device_name = device.name()?;

    // Prefer a float config so the callback receives f32 samples directly
    let configs: Vec<_> = device.supported_input_configs()?.collect();
    let config_range = configs
        .iter()
        .find(|c| c.sample_format() == cpal::SampleFormat::F32)
        .or_else(|| configs.first())
        .ok_or_else(|| AppError::AudioDevice("No supported input configs found".to_string()))?;

    let min_rate = config_range.min_sample_rate().0;
    let max_rate = config_range.max_sample_rate().0;
    let sample_rate = TABLE_RATES
        .into_iter()
        .find(|rate| (min_rate..=max_rate).contains(rate))
        .unwrap_or(min_rate);

    let audio_config = AudioConfig {
        device_name,
        sample_rate,
        channels: config_range.channels().max(1),
    };
    debug!(?audio_config, min_rate, max_rate, "input device configured");

    Ok((device, audio_config))
}

/// Build an audio input stream with the given callback
pub fn build_audio_stream<F>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    data_callback: F,
    shared: &SharedState,
) -> AppResult<cpal::Stream>
where
    F: FnMut(&[f32], &cpal::InputCallbackInfo) + Send + 'static,
{
    let stream_error = shared.stream_error.clone();
    let stream = device.build_input_stream(
        config,
        data_callback,
        move |err| {
            error!(error = %err, "audio stream error");
            if let Ok(mut slot) = stream_error.lock() {
                *slot = Some(err.to_string());
            }
        },
        None,
    )?;

    info!(
        channels = config.channels,
        sample_rate = config.sample_rate.0,
        "input stream built"
    );
    Ok(stream)
}

/// Audio callback: downmix to mono, A-weight sample by sample and keep the
/// latest window for the frame loop
pub fn create_audio_callback(
    analysis: Arc<Mutex<AnalysisBuffer>>,
    mut filter: AWeighting,
    channels: u16,
) -> impl FnMut(&[f32], &cpal::InputCallbackInfo) + Send + 'static {
    let channels = channels.max(1) as usize;
    move |data: &[f32], _: &cpal::InputCallbackInfo| {
        let Ok(mut buffer) = analysis.lock() else {
            return;
        };
        buffer.extend(
            data.chunks(channels)
                .map(|frame| filter.process_sample(downmix(frame))),
        );
    }
}

/// Average one interleaved frame to mono
pub fn downmix(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    frame.iter().sum::<f32>() / frame.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_averages_channels() {
        assert_eq!(downmix(&[0.5, -0.5]), 0.0);
        assert_eq!(downmix(&[0.25, 0.75]), 0.5);
        assert_eq!(downmix(&[0.3]), 0.3);
        assert_eq!(downmix(&[]), 0.0);
    }
}
