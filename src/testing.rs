//! Fakes shared by the unit tests.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use tokio::sync::Notify;

use crate::{
    camera::{
        CameraDevice, DeviceErrorKind, Environment, FrameGeometry, TrackId, VideoConstraints,
        VideoStream,
    },
    error::{BackendError, DeviceError},
    network::{
        wire::{Confidence, ModelStatusResponse, PredictionResponse},
        AnalysisBackend,
    },
};

const TRACKS_PER_STREAM: u32 = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    Open(VideoConstraints),
    Release(TrackId),
}

pub struct FakeCamera {
    environment: Environment,
    open_failures: Mutex<VecDeque<DeviceErrorKind>>,
    ready_failure: Option<DeviceErrorKind>,
    fail_frames: bool,
    next_track: AtomicU32,
    events: Arc<Mutex<Vec<DeviceEvent>>>,
}

impl FakeCamera {
    pub fn new() -> Self {
        Self {
            environment: Environment::local(),
            open_failures: Mutex::new(VecDeque::new()),
            ready_failure: None,
            fail_frames: false,
            next_track: AtomicU32::new(1),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The next opens fail with these kinds, in order.
    pub fn fail_opens(self, kinds: Vec<DeviceErrorKind>) -> Self {
        *self.open_failures.lock().unwrap() = kinds.into();
        self
    }

    pub fn fail_ready(mut self, kind: DeviceErrorKind) -> Self {
        self.ready_failure = Some(kind);
        self
    }

    pub fn fail_frames(mut self) -> Self {
        self.fail_frames = true;
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn events(&self) -> Vec<DeviceEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, DeviceEvent::Open(_)))
            .count()
    }

    pub fn release_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, DeviceEvent::Release(_)))
            .count()
    }
}

#[async_trait]
impl CameraDevice for FakeCamera {
    fn environment(&self) -> Environment {
        self.environment.clone()
    }

    async fn open(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<Box<dyn VideoStream>, DeviceError> {
        self.events
            .lock()
            .unwrap()
            .push(DeviceEvent::Open(*constraints));

        if let Some(kind) = self.open_failures.lock().unwrap().pop_front() {
            return Err(DeviceError::new(kind, format!("{:?}", kind)));
        }

        let tracks = (0..TRACKS_PER_STREAM)
            .map(|_| TrackId(self.next_track.fetch_add(1, Ordering::SeqCst)))
            .collect();
        Ok(Box::new(FakeStream {
            tracks,
            ready_failure: self.ready_failure,
            fail_frames: self.fail_frames,
            events: self.events.clone(),
        }))
    }
}

struct FakeStream {
    tracks: Vec<TrackId>,
    ready_failure: Option<DeviceErrorKind>,
    fail_frames: bool,
    events: Arc<Mutex<Vec<DeviceEvent>>>,
}

#[async_trait]
impl VideoStream for FakeStream {
    fn tracks(&self) -> Vec<TrackId> {
        self.tracks.clone()
    }

    async fn ready(&mut self) -> Result<FrameGeometry, DeviceError> {
        match self.ready_failure {
            Some(kind) => Err(DeviceError::new(kind, "video element error")),
            None => Ok(FrameGeometry {
                width: 64,
                height: 48,
            }),
        }
    }

    fn frame(&mut self) -> Result<RgbImage, DeviceError> {
        if self.fail_frames {
            return Err(DeviceError::new(DeviceErrorKind::Unknown, "frame unavailable"));
        }
        Ok(RgbImage::from_pixel(64, 48, Rgb([210, 160, 140])))
    }

    fn stop_track(&mut self, track: TrackId) {
        self.events.lock().unwrap().push(DeviceEvent::Release(track));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    ModelStatus,
    Predict { image_data: String },
    Upload { file_name: String, mime: String, len: usize },
}

enum Reply {
    Body(PredictionResponse),
    Status(u16),
    Panic,
}

pub struct FakeBackend {
    replies: Mutex<VecDeque<Reply>>,
    model_status: Option<ModelStatusResponse>,
    gate: Option<Arc<Notify>>,
    calls: Mutex<Vec<BackendCall>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            model_status: Some(ModelStatusResponse {
                status: "success".to_string(),
                message: "AI Model loaded and ready for analysis".to_string(),
            }),
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn normal(diagnosis: &str, confidence: &str) -> PredictionResponse {
        PredictionResponse {
            diagnosis: Some(diagnosis.to_string()),
            confidence: Some(Confidence::Text(confidence.to_string())),
            ..PredictionResponse::default()
        }
    }

    pub fn reply(self, response: PredictionResponse) -> Self {
        self.replies.lock().unwrap().push_back(Reply::Body(response));
        self
    }

    pub fn reply_error(self, message: &str) -> Self {
        self.reply(PredictionResponse {
            error: Some(message.to_string()),
            ..PredictionResponse::default()
        })
    }

    pub fn reply_status(self, status: u16) -> Self {
        self.replies.lock().unwrap().push_back(Reply::Status(status));
        self
    }

    pub fn reply_panic(self) -> Self {
        self.replies.lock().unwrap().push_back(Reply::Panic);
        self
    }

    pub fn unreachable_model(mut self) -> Self {
        self.model_status = None;
        self
    }

    /// Holds every analysis request until the returned gate is notified.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Analysis requests only; readiness probes are not counted.
    pub fn analysis_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| !matches!(call, BackendCall::ModelStatus))
            .count()
    }

    async fn answer(&self, endpoint: &'static str) -> Result<PredictionResponse, BackendError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Body(Self::normal("Normal skin", "92%")));
        match reply {
            Reply::Body(body) => Ok(body),
            Reply::Status(status) => Err(BackendError::Status { endpoint, status }),
            Reply::Panic => panic!("backend blew up"),
        }
    }
}

#[async_trait]
impl AnalysisBackend for FakeBackend {
    async fn model_status(&self) -> Result<ModelStatusResponse, BackendError> {
        self.calls.lock().unwrap().push(BackendCall::ModelStatus);
        self.model_status.clone().ok_or(BackendError::Status {
            endpoint: "/test-model",
            status: 503,
        })
    }

    async fn predict(&self, image_data: &str) -> Result<PredictionResponse, BackendError> {
        self.calls.lock().unwrap().push(BackendCall::Predict {
            image_data: image_data.to_string(),
        });
        self.answer("/predict").await
    }

    async fn upload(
        &self,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<PredictionResponse, BackendError> {
        self.calls.lock().unwrap().push(BackendCall::Upload {
            file_name: file_name.to_string(),
            mime: mime.to_string(),
            len: bytes.len(),
        });
        self.answer("/upload").await
    }
}
