use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::{
    notifications::{NotificationCenter, NotificationKind},
    shortcuts::{self, KeyPress},
    view::{CameraControls, ModelStatus, StatusTone, ViewState},
};
use crate::{
    analysis::{render, AnalysisResult, AnalysisSubmitter, PendingAnalysis, RenderedResult},
    camera::{CameraDevice, CameraSession, CameraState, FrameGeometry},
    config::Configuration,
    error::{AppError, CameraError, IntakeError, SubmitError},
    intake::{CapturedImage, FileIntake, FileOrigin, SelectedFile},
    network::AnalysisBackend,
};

const UPLOAD_FALLBACK_HINT: &str = "Please use the file upload option instead";

/// User intents, one per control on the detection page.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SelectFiles {
        origin: FileOrigin,
        files: Vec<SelectedFile>,
    },
    BrowseRequested,
    StartCamera,
    RetryCamera,
    Capture,
    StopCamera,
    Retake,
    Analyze,
    Key(KeyPress),
    DismissNotification(Uuid),
    Teardown,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::SelectFiles { .. } => "SelectFiles",
            Command::BrowseRequested => "BrowseRequested",
            Command::StartCamera => "StartCamera",
            Command::RetryCamera => "RetryCamera",
            Command::Capture => "Capture",
            Command::StopCamera => "StopCamera",
            Command::Retake => "Retake",
            Command::Analyze => "Analyze",
            Command::Key(_) => "Key",
            Command::DismissNotification(_) => "DismissNotification",
            Command::Teardown => "Teardown",
        }
    }
}

/// What the rendering layer should do after a command, beyond redrawing the
/// view.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    OpenFilePicker,
    ImageReady,
    CameraLive(FrameGeometry),
    CameraStopped,
    AnalysisStarted,
    AnalysisFinished(RenderedResult),
}

pub async fn probe_model(backend: &dyn AnalysisBackend) -> ModelStatus {
    match backend.model_status().await {
        Ok(status) if status.is_ready() => ModelStatus::Ready(status.message),
        Ok(status) => {
            warn!("Model not ready: {} {}", status.status, status.message);
            ModelStatus::Unavailable("Model not available".to_string())
        }
        Err(e) => {
            warn!("Model status check failed: {}", e);
            ModelStatus::Unavailable("Cannot connect to server".to_string())
        }
    }
}

/// Owns all state of one detection page: the camera, the current image, the
/// request slot and what is on screen.
pub struct DetectionController {
    intake: FileIntake,
    session: CameraSession,
    submitter: AnalysisSubmitter,
    backend: Arc<dyn AnalysisBackend>,
    current: Option<CapturedImage>,
    view: watch::Sender<ViewState>,
    notifications: NotificationCenter,
}

impl DetectionController {
    pub fn new(
        configuration: &Configuration,
        device: Arc<dyn CameraDevice>,
        backend: Arc<dyn AnalysisBackend>,
    ) -> Self {
        let session = CameraSession::new(device, configuration.jpeg_quality);
        let availability = match session.state() {
            CameraState::Unavailable(reason) => Err(*reason),
            _ => Ok(()),
        };
        let (view, _) = watch::channel(ViewState::new(availability));
        Self {
            intake: FileIntake::new(configuration.max_upload_bytes),
            session,
            submitter: AnalysisSubmitter::new(backend.clone(), configuration.file_route),
            backend,
            current: None,
            view,
            notifications: NotificationCenter::new(configuration.notification_lifetime()),
        }
    }

    pub fn view(&self) -> watch::Receiver<ViewState> {
        self.view.subscribe()
    }

    pub fn snapshot(&self) -> ViewState {
        self.view.borrow().clone()
    }

    pub fn notifications(&mut self) -> &mut NotificationCenter {
        &mut self.notifications
    }

    pub fn current_image(&self) -> Option<&CapturedImage> {
        self.current.as_ref()
    }

    pub fn camera_state(&self) -> &CameraState {
        self.session.state()
    }

    pub fn camera_transitions(&self) -> broadcast::Receiver<CameraState> {
        self.session.subscribe()
    }

    pub fn backend(&self) -> Arc<dyn AnalysisBackend> {
        self.backend.clone()
    }

    fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) {
        self.notifications.notify(kind, message);
    }

    /// Turns key presses into the command they stand for. `None` means the key
    /// does nothing right now.
    pub fn resolve(&self, command: Command) -> Option<Command> {
        match command {
            Command::Key(press) => {
                let capture_enabled = self.view.borrow().camera_controls.capture_enabled;
                shortcuts::resolve(press, capture_enabled, self.session.is_active())
            }
            command => Some(command),
        }
    }

    pub async fn dispatch(&mut self, command: Command) -> Result<Effect, AppError> {
        let Some(command) = self.resolve(command) else {
            return Ok(Effect::None);
        };
        debug!("Dispatching {}", command.name());

        match command {
            Command::SelectFiles { origin, files } => {
                if self.select_files(origin, files).await? {
                    Ok(Effect::ImageReady)
                } else {
                    Ok(Effect::None)
                }
            }
            Command::BrowseRequested => Ok(Effect::OpenFilePicker),
            Command::StartCamera | Command::RetryCamera => {
                Ok(Effect::CameraLive(self.start_camera().await?))
            }
            Command::Capture => {
                self.capture()?;
                Ok(Effect::ImageReady)
            }
            Command::StopCamera => {
                if self.stop_camera() {
                    Ok(Effect::CameraStopped)
                } else {
                    Ok(Effect::None)
                }
            }
            Command::Retake => Ok(self.retake().await?),
            Command::Analyze => Ok(Effect::AnalysisFinished(self.analyze().await?)),
            Command::DismissNotification(id) => {
                self.notifications.dismiss(id);
                Ok(Effect::None)
            }
            Command::Teardown => {
                self.teardown();
                Ok(Effect::CameraStopped)
            }
            Command::Key(_) => Ok(Effect::None),
        }
    }

    /// Click-to-browse and drag-and-drop both land here.
    pub async fn select_files(
        &mut self,
        origin: FileOrigin,
        files: Vec<SelectedFile>,
    ) -> Result<bool, IntakeError> {
        match self.intake.accept(origin, files).await {
            Ok(Some(image)) => {
                self.show_image(image);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => {
                self.notify(NotificationKind::Error, e.to_string());
                Err(e)
            }
        }
    }

    fn show_image(&mut self, image: CapturedImage) {
        let preview = image.preview().to_string();
        debug!("Image {} is now current", image.id);
        self.current = Some(image);
        self.view.send_modify(|view| {
            view.preview = Some(preview);
            view.result = None;
            view.analyze_enabled = !view.loading;
        });
    }

    #[instrument(skip(self))]
    pub async fn start_camera(&mut self) -> Result<FrameGeometry, CameraError> {
        if let CameraState::Unavailable(reason) = self.session.state() {
            let reason = *reason;
            self.notify(NotificationKind::Error, reason.to_string());
            self.notify(NotificationKind::Info, UPLOAD_FALLBACK_HINT);
            return Err(CameraError::Unavailable(reason));
        }

        self.view.send_modify(|view| {
            view.set_camera_status("Starting camera...", StatusTone::Loading);
            view.camera_controls = CameraControls::starting();
        });

        match self.session.start().await {
            Ok(geometry) => {
                self.view.send_modify(|view| {
                    view.set_camera_status("Camera ready - Click capture", StatusTone::Ready);
                    view.camera_controls = CameraControls::live();
                });
                self.notify(NotificationKind::Success, "Camera started successfully!");
                Ok(geometry)
            }
            Err(e) => {
                self.view.send_modify(|view| {
                    view.set_camera_status("Camera failed to start", StatusTone::Error);
                    view.camera_controls = CameraControls::failed();
                });
                self.notify(NotificationKind::Error, e.to_string());
                if let CameraError::Device(device_error) = &e {
                    if device_error.kind.suggests_file_upload() {
                        self.notify(NotificationKind::Info, UPLOAD_FALLBACK_HINT);
                    }
                }
                Err(e)
            }
        }
    }

    pub fn capture(&mut self) -> Result<(), CameraError> {
        if !self.session.is_active() {
            self.notify(NotificationKind::Error, "Camera not active");
            return Err(CameraError::NotActive);
        }

        self.view
            .send_modify(|view| view.set_camera_status("Capturing...", StatusTone::Loading));

        match self.session.capture() {
            Ok(image) => {
                self.show_image(image);
                self.view.send_modify(|view| {
                    view.camera_controls.retake_visible = true;
                    view.set_camera_status("Photo captured!", StatusTone::Ready);
                });
                self.notify(NotificationKind::Success, "Photo captured successfully!");
                Ok(())
            }
            Err(e) => {
                error!("Capture error: {}", e);
                self.view
                    .send_modify(|view| view.set_camera_status("Capture failed", StatusTone::Error));
                self.notify(NotificationKind::Error, "Failed to capture photo");
                Err(e)
            }
        }
    }

    /// Returns `false` when there was no open stream.
    pub fn stop_camera(&mut self) -> bool {
        if !self.session.stop() {
            return false;
        }
        self.view.send_modify(|view| {
            view.camera_controls = CameraControls::idle();
            view.set_camera_status("Camera stopped", StatusTone::Ready);
        });
        self.notify(NotificationKind::Info, "Camera stopped");
        true
    }

    /// Discards the captured still and goes back to the live feed, or starts
    /// the camera when there is no stream to go back to.
    pub async fn retake(&mut self) -> Result<Effect, CameraError> {
        if !self.session.is_active() {
            return self.start_camera().await.map(Effect::CameraLive);
        }

        self.current = None;
        self.view.send_modify(|view| {
            view.preview = None;
            view.result = None;
            view.analyze_enabled = false;
            view.camera_controls = CameraControls::live();
            view.set_camera_status("Camera ready - Click capture", StatusTone::Ready);
        });
        Ok(Effect::None)
    }

    /// Reserves the request slot and flips the view into its loading state.
    pub fn begin_analysis(&mut self) -> Result<PendingAnalysis, SubmitError> {
        match self.submitter.begin(self.current.as_ref()) {
            Ok(pending) => {
                self.view.send_modify(|view| {
                    view.loading = true;
                    view.result = None;
                    view.analyze_enabled = false;
                });
                Ok(pending)
            }
            Err(e) => {
                self.notify(NotificationKind::Error, e.to_string());
                Err(e)
            }
        }
    }

    /// Always clears the loading indicator, whatever the outcome.
    pub fn finish_analysis(
        &mut self,
        result: Result<AnalysisResult, SubmitError>,
    ) -> Result<RenderedResult, SubmitError> {
        let has_image = self.current.is_some();
        self.view.send_modify(|view| {
            view.loading = false;
            view.analyze_enabled = has_image;
        });

        match result {
            Ok(result) => {
                let rendered = render(&result);
                self.view
                    .send_modify(|view| view.result = Some(rendered.clone()));
                self.notify(NotificationKind::Success, "Analysis completed successfully!");
                Ok(rendered)
            }
            Err(e) => {
                error!("Analysis error: {}", e);
                self.notify(NotificationKind::Error, "Analysis failed. Please try again.");
                Err(e)
            }
        }
    }

    pub async fn analyze(&mut self) -> Result<RenderedResult, SubmitError> {
        let pending = self.begin_analysis()?;
        let result = pending.run().await;
        self.finish_analysis(result)
    }

    pub fn apply_model_status(&mut self, status: ModelStatus) {
        info!("Model status: {:?}", status);
        self.view.send_modify(|view| view.model_status = status);
    }

    pub async fn refresh_model_status(&mut self) -> ModelStatus {
        let status = probe_model(self.backend.as_ref()).await;
        self.apply_model_status(status.clone());
        status
    }

    /// Releases the camera and forgets the current image.
    pub fn teardown(&mut self) {
        info!("Tearing down detection controller");
        let released = self.session.stop();
        self.current = None;
        self.view.send_modify(|view| {
            view.preview = None;
            view.analyze_enabled = false;
            if released {
                view.camera_controls = CameraControls::idle();
                view.set_camera_status("Camera stopped", StatusTone::Ready);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::Classification,
        app::shortcuts::{Focus, Key},
        camera::{DeviceErrorKind, Environment, UnavailableReason},
        config::FileRoute,
        testing::{BackendCall, FakeBackend, FakeCamera},
    };

    fn controller_with(
        configuration: Configuration,
        camera: Arc<FakeCamera>,
        backend: Arc<FakeBackend>,
    ) -> DetectionController {
        DetectionController::new(&configuration, camera, backend)
    }

    fn controller(camera: Arc<FakeCamera>, backend: Arc<FakeBackend>) -> DetectionController {
        controller_with(Configuration::default(), camera, backend)
    }

    fn png(size: usize) -> SelectedFile {
        SelectedFile::from_bytes("lesion.png", "image/png", vec![0x89; size])
    }

    #[tokio::test]
    async fn test_drop_png_then_analyze_shows_favorable_result() {
        let backend = Arc::new(FakeBackend::new().reply(FakeBackend::normal("Normal", "92%")));
        let configuration = Configuration {
            file_route: FileRoute::Predict,
            ..Configuration::default()
        };
        let mut controller =
            controller_with(configuration, Arc::new(FakeCamera::new()), backend.clone());

        let effect = controller
            .dispatch(Command::SelectFiles {
                origin: FileOrigin::Drop,
                files: vec![png(2 * 1024 * 1024)],
            })
            .await
            .unwrap();
        assert_eq!(effect, Effect::ImageReady);
        let view = controller.snapshot();
        assert!(view.preview.as_deref().unwrap().starts_with("data:image/png;base64,"));
        assert!(view.analyze_enabled);

        let effect = controller.dispatch(Command::Analyze).await.unwrap();
        let Effect::AnalysisFinished(rendered) = effect else {
            panic!("unexpected effect {:?}", effect);
        };
        assert_eq!(rendered.diagnosis, "Normal");
        assert_eq!(rendered.classification, Classification::Favorable);

        let view = controller.snapshot();
        assert!(!view.loading);
        assert_eq!(view.result, Some(rendered));
        assert!(matches!(
            backend.calls().as_slice(),
            [BackendCall::Predict { .. }]
        ));
    }

    #[tokio::test]
    async fn test_invalid_file_keeps_previous_image() {
        let mut controller =
            controller(Arc::new(FakeCamera::new()), Arc::new(FakeBackend::new()));
        controller
            .select_files(FileOrigin::Browse, vec![png(16)])
            .await
            .unwrap();
        let before = controller.current_image().cloned();

        let result = controller
            .select_files(
                FileOrigin::Browse,
                vec![SelectedFile::from_bytes("notes.txt", "text/plain", vec![1])],
            )
            .await;
        assert!(matches!(result, Err(IntakeError::InvalidType { .. })));
        assert_eq!(controller.current_image().cloned(), before);
        assert!(controller
            .notifications()
            .messages()
            .contains(&(NotificationKind::Error, "Please select a valid image file.".to_string())));
    }

    #[tokio::test]
    async fn test_analyze_without_image_makes_no_call() {
        let backend = Arc::new(FakeBackend::new());
        let mut controller = controller(Arc::new(FakeCamera::new()), backend.clone());

        let result = controller.dispatch(Command::Analyze).await;
        assert!(matches!(
            result,
            Err(AppError::Submit(SubmitError::NoImageSelected))
        ));
        assert_eq!(backend.analysis_calls(), 0);
        assert!(!controller.snapshot().loading);
        assert!(controller.notifications().messages().contains(&(
            NotificationKind::Error,
            "Please select or capture an image first.".to_string()
        )));
    }

    #[tokio::test]
    async fn test_error_response_clears_loading() {
        let backend = Arc::new(FakeBackend::new().reply_error("Prediction error: bad image"));
        let mut controller = controller(Arc::new(FakeCamera::new()), backend);
        controller
            .select_files(FileOrigin::Drop, vec![png(64)])
            .await
            .unwrap();

        let result = controller.analyze().await;
        assert_eq!(
            result,
            Err(SubmitError::Analysis("Prediction error: bad image".to_string()))
        );
        let view = controller.snapshot();
        assert!(!view.loading);
        assert!(view.analyze_enabled);
        assert_eq!(view.result, None);
        assert!(controller.notifications().messages().contains(&(
            NotificationKind::Error,
            "Analysis failed. Please try again.".to_string()
        )));
    }

    #[tokio::test]
    async fn test_permission_denied_shows_retry() {
        let camera = Arc::new(FakeCamera::new().fail_opens(vec![
            DeviceErrorKind::PermissionDenied,
            DeviceErrorKind::PermissionDenied,
            DeviceErrorKind::PermissionDenied,
        ]));
        let mut controller = controller(camera, Arc::new(FakeBackend::new()));
        assert_eq!(controller.camera_state(), &CameraState::Idle);
        let mut transitions = controller.camera_transitions();

        let result = controller.dispatch(Command::StartCamera).await;
        assert!(matches!(result, Err(AppError::Camera(CameraError::Device(_)))));

        assert_eq!(transitions.try_recv().unwrap(), CameraState::Starting);
        assert_eq!(
            transitions.try_recv().unwrap(),
            CameraState::Error(DeviceErrorKind::PermissionDenied)
        );

        let view = controller.snapshot();
        assert!(view.camera_controls.retry_visible);
        assert!(view.camera_controls.start_enabled);
        assert_eq!(view.camera_status.tone, StatusTone::Error);
        assert!(controller.notifications().messages().contains(&(
            NotificationKind::Error,
            DeviceErrorKind::PermissionDenied.user_message().to_string()
        )));

        let effect = controller.dispatch(Command::RetryCamera).await.unwrap();
        assert!(matches!(effect, Effect::CameraLive(_)));
        assert!(!controller.snapshot().camera_controls.retry_visible);
    }

    #[tokio::test]
    async fn test_missing_camera_suggests_upload() {
        let camera = Arc::new(FakeCamera::new().fail_opens(vec![
            DeviceErrorKind::DeviceNotFound,
            DeviceErrorKind::DeviceNotFound,
            DeviceErrorKind::DeviceNotFound,
        ]));
        let mut controller = controller(camera, Arc::new(FakeBackend::new()));

        assert!(controller.start_camera().await.is_err());
        let messages = controller.notifications().messages();
        assert!(messages.contains(&(NotificationKind::Info, UPLOAD_FALLBACK_HINT.to_string())));
    }

    #[tokio::test]
    async fn test_insecure_context_disables_camera() {
        let camera = Arc::new(
            FakeCamera::new().with_environment(Environment::new(true, "http", "clinic.example")),
        );
        let mut controller = controller(camera.clone(), Arc::new(FakeBackend::new()));

        let view = controller.snapshot();
        assert!(!view.camera_controls.start_enabled);
        assert_eq!(view.camera_controls.start_label, "HTTPS Required");
        assert_eq!(view.camera_status.message, "Camera requires HTTPS connection");

        let result = controller.start_camera().await;
        assert_eq!(
            result,
            Err(CameraError::Unavailable(UnavailableReason::InsecureContext))
        );
        assert_eq!(camera.open_count(), 0);
    }

    #[tokio::test]
    async fn test_capture_retake_and_stop() {
        let camera = Arc::new(FakeCamera::new());
        let mut controller = controller(camera.clone(), Arc::new(FakeBackend::new()));
        controller.dispatch(Command::StartCamera).await.unwrap();

        let view = controller.snapshot();
        assert!(view.camera_controls.capture_enabled);
        assert!(view.camera_controls.stop_enabled);
        assert!(!view.camera_controls.start_enabled);

        controller.dispatch(Command::Capture).await.unwrap();
        assert_eq!(controller.camera_state(), &CameraState::Live);
        let view = controller.snapshot();
        assert!(view.camera_controls.retake_visible);
        assert!(view.preview.as_deref().unwrap().starts_with("data:image/jpeg;base64,"));

        controller.dispatch(Command::Retake).await.unwrap();
        assert!(controller.current_image().is_none());
        assert_eq!(controller.snapshot().preview, None);
        assert_eq!(camera.open_count(), 1);

        assert_eq!(
            controller.dispatch(Command::StopCamera).await.unwrap(),
            Effect::CameraStopped
        );
        assert_eq!(
            controller.dispatch(Command::StopCamera).await.unwrap(),
            Effect::None
        );
        assert_eq!(camera.release_count(), 2);
        assert!(controller.snapshot().camera_controls.start_enabled);
    }

    #[tokio::test]
    async fn test_retake_without_stream_starts_camera() {
        let camera = Arc::new(FakeCamera::new());
        let mut controller = controller(camera.clone(), Arc::new(FakeBackend::new()));

        let effect = controller.dispatch(Command::Retake).await.unwrap();
        assert!(matches!(effect, Effect::CameraLive(_)));
        assert_eq!(controller.camera_state(), &CameraState::Live);
    }

    #[tokio::test]
    async fn test_capture_without_camera_notifies() {
        let mut controller =
            controller(Arc::new(FakeCamera::new()), Arc::new(FakeBackend::new()));
        let result = controller.dispatch(Command::Capture).await;
        assert!(matches!(
            result,
            Err(AppError::Camera(CameraError::NotActive))
        ));
        assert!(controller
            .notifications()
            .messages()
            .contains(&(NotificationKind::Error, "Camera not active".to_string())));
    }

    #[tokio::test]
    async fn test_keyboard_shortcuts_drive_camera() {
        let camera = Arc::new(FakeCamera::new());
        let mut controller = controller(camera.clone(), Arc::new(FakeBackend::new()));
        controller.start_camera().await.unwrap();

        let effect = controller
            .dispatch(Command::Key(KeyPress::new(Key::Char('c'), Focus::Other)))
            .await
            .unwrap();
        assert_eq!(effect, Effect::ImageReady);

        let effect = controller
            .dispatch(Command::Key(KeyPress::new(Key::Escape, Focus::Other)))
            .await
            .unwrap();
        assert_eq!(effect, Effect::CameraStopped);

        let effect = controller
            .dispatch(Command::Key(KeyPress::new(Key::Enter, Focus::UploadArea)))
            .await
            .unwrap();
        assert_eq!(effect, Effect::OpenFilePicker);
    }

    #[tokio::test]
    async fn test_teardown_releases_camera() {
        let camera = Arc::new(FakeCamera::new());
        let mut controller = controller(camera.clone(), Arc::new(FakeBackend::new()));
        controller.start_camera().await.unwrap();
        controller.capture().unwrap();

        controller.dispatch(Command::Teardown).await.unwrap();
        assert_eq!(camera.release_count(), 2);
        assert!(controller.current_image().is_none());

        let view = controller.snapshot();
        assert_eq!(view.camera_status.message, "Camera stopped");
        assert_eq!(view.camera_status.tone, StatusTone::Ready);
        assert!(view.camera_controls.start_enabled);
        assert_eq!(view.preview, None);
    }

    #[tokio::test]
    async fn test_model_status_probe() {
        let mut online =
            controller(Arc::new(FakeCamera::new()), Arc::new(FakeBackend::new()));
        assert_eq!(online.snapshot().model_status, ModelStatus::Checking);
        assert_eq!(
            online.refresh_model_status().await,
            ModelStatus::Ready("AI Model loaded and ready for analysis".to_string())
        );

        let mut offline = controller(
            Arc::new(FakeCamera::new()),
            Arc::new(FakeBackend::new().unreachable_model()),
        );
        assert_eq!(
            offline.refresh_model_status().await,
            ModelStatus::Unavailable("Cannot connect to server".to_string())
        );
    }
}
