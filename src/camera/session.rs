use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

use super::{
    constraints::VideoConstraints,
    device::{CameraDevice, DeviceErrorKind, FrameGeometry, TrackId, VideoStream},
    environment::UnavailableReason,
    snapshot,
};
use crate::{
    error::{CameraError, DeviceError},
    intake::CapturedImage,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraState {
    Unavailable(UnavailableReason),
    Idle,
    Starting,
    Live,
    Capturing,
    Stopped,
    Error(DeviceErrorKind),
}

/// Owns the camera for one controller. At most one stream is open at a time
/// and every track it acquired is stopped on stop, restart and drop.
pub struct CameraSession {
    device: Arc<dyn CameraDevice>,
    state: CameraState,
    stream: Option<Box<dyn VideoStream>>,
    tracks: Vec<TrackId>,
    last_constraints: Option<VideoConstraints>,
    geometry: Option<FrameGeometry>,
    jpeg_quality: u8,
    transitions: broadcast::Sender<CameraState>,
}

impl CameraSession {
    pub fn new(device: Arc<dyn CameraDevice>, jpeg_quality: u8) -> Self {
        let state = match device.environment().check() {
            Ok(()) => CameraState::Idle,
            Err(reason) => {
                warn!("Camera unavailable: {}", reason);
                CameraState::Unavailable(reason)
            }
        };
        let (transitions, _) = broadcast::channel(32);
        Self {
            device,
            state,
            stream: None,
            tracks: Vec::new(),
            last_constraints: None,
            geometry: None,
            jpeg_quality,
            transitions,
        }
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    pub fn tracks(&self) -> &[TrackId] {
        &self.tracks
    }

    pub fn last_constraints(&self) -> Option<&VideoConstraints> {
        self.last_constraints.as_ref()
    }

    pub fn geometry(&self) -> Option<FrameGeometry> {
        self.geometry
    }

    /// Every state entered from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CameraState> {
        self.transitions.subscribe()
    }

    fn transition(&mut self, next: CameraState) {
        debug!("Camera {:?} -> {:?}", self.state, next);
        self.state = next.clone();
        let _ = self.transitions.send(next);
    }

    /// Stops every acquired track and detaches the stream. Returns how many
    /// tracks were released.
    fn release_tracks(&mut self) -> usize {
        let Some(mut stream) = self.stream.take() else {
            return 0;
        };
        let tracks = std::mem::take(&mut self.tracks);
        for track in &tracks {
            stream.stop_track(*track);
        }
        self.geometry = None;
        debug!("Released {} camera track(s)", tracks.len());
        tracks.len()
    }

    /// Opens the camera, walking the constraint ladder from scratch. Any
    /// running stream is released before the first open attempt.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<FrameGeometry, CameraError> {
        if let CameraState::Unavailable(reason) = &self.state {
            return Err(CameraError::Unavailable(*reason));
        }

        self.release_tracks();
        self.transition(CameraState::Starting);

        let mut opened = None;
        let mut last_error = None;
        for constraints in VideoConstraints::ladder() {
            debug!("Trying constraints: {:?}", constraints);
            match self.device.open(&constraints).await {
                Ok(stream) => {
                    info!("Camera opened with constraints: {:?}", constraints);
                    opened = Some((stream, constraints));
                    break;
                }
                Err(e) => {
                    debug!("Failed with constraints {:?}: {}", constraints, e);
                    last_error = Some(e);
                }
            }
        }

        let Some((stream, constraints)) = opened else {
            let error = last_error.unwrap_or_else(|| {
                DeviceError::new(DeviceErrorKind::Unknown, "no constraint set was attempted")
            });
            error!("Camera failed to start: {}", error);
            self.transition(CameraState::Error(error.kind));
            return Err(CameraError::Device(error));
        };

        self.tracks = stream.tracks();
        self.last_constraints = Some(constraints);
        let stream = self.stream.insert(stream);

        match stream.ready().await {
            Ok(geometry) => {
                info!("Camera live at {}x{}", geometry.width, geometry.height);
                self.geometry = Some(geometry);
                self.transition(CameraState::Live);
                Ok(geometry)
            }
            Err(e) => {
                error!("Camera stream never became ready: {}", e);
                self.release_tracks();
                self.transition(CameraState::Error(e.kind));
                Err(CameraError::Device(e))
            }
        }
    }

    /// Grabs the current frame as a JPEG still. The stream keeps running.
    pub fn capture(&mut self) -> Result<CapturedImage, CameraError> {
        if self.state != CameraState::Live {
            return Err(CameraError::NotActive);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(CameraError::NotActive);
        };

        let frame = stream.frame();
        self.transition(CameraState::Capturing);
        let result = frame
            .map_err(|e| CameraError::Capture(e.to_string()))
            .and_then(|frame| {
                snapshot::encode_jpeg(&frame, self.jpeg_quality).map_err(CameraError::Capture)
            });
        self.transition(CameraState::Live);

        let jpeg = result?;
        debug!("Captured {} byte JPEG", jpeg.len());
        Ok(CapturedImage::from_jpeg(&jpeg))
    }

    /// Releases the camera. Returns `false` when nothing was open.
    pub fn stop(&mut self) -> bool {
        if self.stream.is_none() {
            debug!("Camera stop requested with no open stream");
            return false;
        }
        let released = self.release_tracks();
        info!("Camera stopped, {} track(s) released", released);
        self.transition(CameraState::Stopped);
        true
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.release_tracks();
    }
}
