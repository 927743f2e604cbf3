use async_trait::async_trait;
use image::RgbImage;

use super::{constraints::VideoConstraints, environment::Environment};
use crate::error::DeviceError;

/// Closed set of reasons a camera could not be opened or read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceErrorKind {
    PermissionDenied,
    DeviceNotFound,
    DeviceBusy,
    ConstraintsUnsupported,
    Unsupported,
    Unknown,
}

impl DeviceErrorKind {
    /// Maps a platform error name (as reported by the media capture API) onto
    /// the closed enumeration. Adapters call this so nothing above the device
    /// layer matches on strings.
    pub fn from_platform_name(name: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" | "SecurityError" => {
                DeviceErrorKind::PermissionDenied
            }
            "NotFoundError" | "DevicesNotFoundError" => DeviceErrorKind::DeviceNotFound,
            "NotReadableError" | "TrackStartError" | "AbortError" => DeviceErrorKind::DeviceBusy,
            "OverconstrainedError" | "ConstraintNotSatisfiedError" => {
                DeviceErrorKind::ConstraintsUnsupported
            }
            "NotSupportedError" | "TypeError" => DeviceErrorKind::Unsupported,
            _ => DeviceErrorKind::Unknown,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            DeviceErrorKind::PermissionDenied => {
                "Camera permission denied. Please allow camera access in your browser settings."
            }
            DeviceErrorKind::DeviceNotFound => "No camera found on this device.",
            DeviceErrorKind::DeviceBusy => "Camera is in use by another application.",
            DeviceErrorKind::ConstraintsUnsupported => {
                "Camera constraints not supported. Trying fallback..."
            }
            DeviceErrorKind::Unsupported => {
                "Camera not supported in this browser. Please use file upload instead."
            }
            DeviceErrorKind::Unknown => "Camera access denied. Please allow camera permissions.",
        }
    }

    /// Whether the camera path is a dead end and the user should upload a file.
    pub fn suggests_file_upload(&self) -> bool {
        matches!(
            self,
            DeviceErrorKind::Unsupported | DeviceErrorKind::DeviceNotFound
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
}

/// An open video stream. Dropping it does not release the hardware; callers
/// must stop every track.
#[async_trait]
pub trait VideoStream: Send + Sync {
    fn tracks(&self) -> Vec<TrackId>;

    /// Resolves once the first frame's metadata is known.
    async fn ready(&mut self) -> Result<FrameGeometry, DeviceError>;

    /// The current frame at native resolution.
    fn frame(&mut self) -> Result<RgbImage, DeviceError>;

    fn stop_track(&mut self, track: TrackId);
}

#[async_trait]
pub trait CameraDevice: Send + Sync {
    fn environment(&self) -> Environment;

    async fn open(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<Box<dyn VideoStream>, DeviceError>;
}

/// Device for hosts without any capture API, such as the command-line
/// client. Sessions built on it start out `Unavailable`.
#[derive(Debug, Clone, Default)]
pub struct NoCamera;

#[async_trait]
impl CameraDevice for NoCamera {
    fn environment(&self) -> Environment {
        Environment::new(false, "https", "localhost")
    }

    async fn open(
        &self,
        _constraints: &VideoConstraints,
    ) -> Result<Box<dyn VideoStream>, DeviceError> {
        Err(DeviceError::new(
            DeviceErrorKind::Unsupported,
            "no capture API on this host",
        ))
    }
}
