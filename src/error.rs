//! Custom error types for the application

use std::fmt;

/// Application-specific error type
#[derive(Debug)]
pub enum AppError {
    /// The OS refused microphone access
    PermissionDenied(String),
    /// No input device, or none with the requested name
    DeviceNotFound(String),
    /// Audio device related errors
    AudioDevice(String),
    /// Audio stream related errors
    AudioStream(String),
    /// Invalid command line values or persisted settings
    Config(String),

    /// General I/O errors
    Io(std::io::Error),
    /// Persisted settings could not be encoded or decoded
    Json(serde_json::Error),
}

impl AppError {
    /// Short message for the status banner
    pub fn banner_message(&self) -> String {
        match self {
            AppError::PermissionDenied(_) => {
                "Microphone permission denied. Allow terminal access to the microphone in the system privacy settings, then press 's'.".to_string()
            }
            AppError::DeviceNotFound(_) => {
                "No microphone found. Check the connection or the device name, then press 's'.".to_string()
            }
            other => format!("Could not open the microphone: {}", other),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            AppError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            AppError::AudioDevice(msg) => write!(f, "Audio device error: {}", msg),
            AppError::AudioStream(msg) => write!(f, "Audio stream error: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Io(err) => write!(f, "I/O error: {}", err),
            AppError::Json(err) => write!(f, "Settings format error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            AppError::Json(err) => Some(err),
            _ => None,
        }
    }
}

/// Backends report refused capture as free text
fn mentions_permission(description: &str) -> bool {
    let lower = description.to_ascii_lowercase();
    lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized")
}

fn from_backend(err: &cpal::BackendSpecificError, context: &str) -> AppError {
    if mentions_permission(&err.description) {
        AppError::PermissionDenied(err.description.clone())
    } else {
        AppError::AudioStream(format!("{}: {}", context, err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Json(err)
    }
}

impl From<cpal::DevicesError> for AppError {
    fn from(err: cpal::DevicesError) -> Self {
        AppError::AudioDevice(format!("Failed to enumerate devices: {}", err))
    }
}

impl From<cpal::DeviceNameError> for AppError {
    fn from(err: cpal::DeviceNameError) -> Self {
        AppError::AudioDevice(format!("Failed to get device name: {}", err))
    }
}

impl From<cpal::SupportedStreamConfigsError> for AppError {
    fn from(err: cpal::SupportedStreamConfigsError) -> Self {
        match err {
            cpal::SupportedStreamConfigsError::DeviceNotAvailable => {
                AppError::DeviceNotFound("Input device is no longer available".to_string())
            }
            cpal::SupportedStreamConfigsError::BackendSpecific { ref err } => {
                from_backend(err, "Failed to get supported stream configs")
            }
            other => AppError::AudioDevice(format!("Failed to get supported stream configs: {}", other)),
        }
    }
}

impl From<cpal::BuildStreamError> for AppError {
    fn from(err: cpal::BuildStreamError) -> Self {
        match err {
            cpal::BuildStreamError::DeviceNotAvailable => {
                AppError::DeviceNotFound("Input device is no longer available".to_string())
            }
            cpal::BuildStreamError::BackendSpecific { ref err } => {
                from_backend(err, "Failed to build audio stream")
            }
            other => AppError::AudioStream(format!("Failed to build audio stream: {}", other)),
        }
    }
}

impl From<cpal::PlayStreamError> for AppError {
    fn from(err: cpal::PlayStreamError) -> Self {
        match err {
            cpal::PlayStreamError::DeviceNotAvailable => {
                AppError::DeviceNotFound("Input device is no longer available".to_string())
            }
            cpal::PlayStreamError::BackendSpecific { ref err } => {
                from_backend(err, "Failed to play audio stream")
            }
        }
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_permission_text_maps_to_permission_denied() {
        let err = cpal::BuildStreamError::BackendSpecific {
            err: cpal::BackendSpecificError {
                description: "Access Denied by the user".to_string(),
            },
        };
        assert!(matches!(AppError::from(err), AppError::PermissionDenied(_)));
    }

    #[test]
    fn test_missing_device_maps_to_device_not_found() {
        let err = AppError::from(cpal::BuildStreamError::DeviceNotAvailable);
        assert!(matches!(err, AppError::DeviceNotFound(_)));
        assert!(err.banner_message().starts_with("No microphone found"));
    }

    #[test]
    fn test_other_backend_errors_stay_stream_errors() {
        let err = cpal::PlayStreamError::BackendSpecific {
            err: cpal::BackendSpecificError {
                description: "underrun".to_string(),
            },
        };
        assert!(matches!(AppError::from(err), AppError::AudioStream(_)));
    }
}
