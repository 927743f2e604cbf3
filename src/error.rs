use thiserror::Error;

use crate::camera::DeviceErrorKind;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Intake Error: {0}")]
    Intake(#[from] IntakeError),
    #[error("Camera Error: {0}")]
    Camera(#[from] CameraError),
    #[error("Submit Error: {0}")]
    Submit(#[from] SubmitError),
    #[error("Backend Error: {0}")]
    Backend(#[from] BackendError),
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),
    #[error("Controller task is gone: {0}")]
    ControllerGone(String),
}

// File intake validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntakeError {
    #[error("Please select a valid image file.")]
    InvalidType { mime: String },
    #[error("File size must be less than {}.", size_label(.limit))]
    TooLarge { size: u64, limit: u64 },
    #[error("Failed to read {name}: {message}")]
    Unreadable { name: String, message: String },
}

const MIB: u64 = 1024 * 1024;

// Whole mebibytes print as MB, anything else as KB rounded up.
fn size_label(limit: &u64) -> String {
    if *limit >= MIB && limit % MIB == 0 {
        format!("{}MB", limit / MIB)
    } else {
        format!("{}KB", limit.div_ceil(1024))
    }
}

// Raised by a device adapter when it cannot open or read the camera.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct DeviceError {
    pub kind: DeviceErrorKind,
    pub message: String,
}

impl DeviceError {
    pub fn new(kind: DeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("{0}")]
    Unavailable(crate::camera::UnavailableReason),
    #[error("{}", .0.kind.user_message())]
    Device(DeviceError),
    #[error("Camera not active")]
    NotActive,
    #[error("Failed to capture photo: {0}")]
    Capture(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Please select or capture an image first.")]
    NoImageSelected,
    #[error("An analysis is already in progress.")]
    InFlight,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Analysis error: {0}")]
    Analysis(String),
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} answered with HTTP {status}")]
    Status {
        endpoint: &'static str,
        status: u16,
    },
    #[error("Failed to decode response from {endpoint}: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },
    #[error("Failed to encode request for {endpoint}: {message}")]
    Encode {
        endpoint: &'static str,
        message: String,
    },
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
