use crate::{analysis::RenderedResult, camera::UnavailableReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Ready,
    Loading,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraStatus {
    pub message: String,
    pub tone: StatusTone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraControls {
    pub start_label: String,
    pub start_enabled: bool,
    pub capture_enabled: bool,
    pub stop_enabled: bool,
    pub retake_visible: bool,
    pub retry_visible: bool,
    pub feed_visible: bool,
}

impl CameraControls {
    pub fn idle() -> Self {
        Self {
            start_label: "Start Camera".to_string(),
            start_enabled: true,
            capture_enabled: false,
            stop_enabled: false,
            retake_visible: false,
            retry_visible: false,
            feed_visible: false,
        }
    }

    pub fn unavailable(reason: UnavailableReason) -> Self {
        let start_label = match reason {
            UnavailableReason::InsecureContext => "HTTPS Required",
            UnavailableReason::ApiMissing => "Camera Not Supported",
        };
        Self {
            start_label: start_label.to_string(),
            start_enabled: false,
            ..Self::idle()
        }
    }

    pub fn starting() -> Self {
        Self {
            start_enabled: false,
            ..Self::idle()
        }
    }

    pub fn live() -> Self {
        Self {
            start_enabled: false,
            capture_enabled: true,
            stop_enabled: true,
            feed_visible: true,
            ..Self::idle()
        }
    }

    pub fn failed() -> Self {
        Self {
            retry_visible: true,
            ..Self::idle()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    Checking,
    Ready(String),
    Unavailable(String),
}

/// Everything a rendering layer draws for the detection page.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub camera_status: CameraStatus,
    pub camera_controls: CameraControls,
    pub preview: Option<String>,
    pub analyze_enabled: bool,
    pub loading: bool,
    pub result: Option<RenderedResult>,
    pub model_status: ModelStatus,
}

impl ViewState {
    pub fn new(camera: Result<(), UnavailableReason>) -> Self {
        let (camera_status, camera_controls) = match camera {
            Ok(()) => (
                CameraStatus {
                    message: "Camera ready - Click to start".to_string(),
                    tone: StatusTone::Ready,
                },
                CameraControls::idle(),
            ),
            Err(reason) => (
                CameraStatus {
                    message: reason.to_string(),
                    tone: StatusTone::Error,
                },
                CameraControls::unavailable(reason),
            ),
        };
        Self {
            camera_status,
            camera_controls,
            preview: None,
            analyze_enabled: false,
            loading: false,
            result: None,
            model_status: ModelStatus::Checking,
        }
    }

    pub fn set_camera_status(&mut self, message: impl Into<String>, tone: StatusTone) {
        self.camera_status = CameraStatus {
            message: message.into(),
            tone,
        };
    }
}
