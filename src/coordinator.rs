use std::sync::Arc;

use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info};

use crate::{
    analysis::AnalysisResult,
    app::{
        controller::{probe_model, Command, DetectionController, Effect},
        notifications::Notification,
        view::{ModelStatus, ViewState},
    },
    camera::{CameraDevice, NoCamera},
    config::{Configuration, FileRoute},
    error::{AppError, SubmitError},
    network::{AnalysisBackend, HttpBackend},
};

pub enum ControllerCommand {
    Dispatch {
        command: Command,
        responder: oneshot::Sender<Result<Effect, AppError>>,
    },
    Notifications {
        responder: oneshot::Sender<Vec<Notification>>,
    },
    SubscribeNotifications {
        responder: oneshot::Sender<broadcast::Receiver<Notification>>,
    },
    Shutdown {
        responder: oneshot::Sender<()>,
    },
}

/// Work finished off the controller task, fed back into it.
enum Completion {
    Analysis(Result<AnalysisResult, SubmitError>),
    ModelStatus(ModelStatus),
}

#[derive(Clone)]
pub struct ControllerHandle {
    command_tx: mpsc::Sender<ControllerCommand>,
    view: watch::Receiver<ViewState>,
}

impl ControllerHandle {
    async fn request<T>(
        &self,
        command: ControllerCommand,
        response_rx: oneshot::Receiver<T>,
    ) -> Result<T, AppError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| AppError::ControllerGone("command channel closed".to_string()))?;
        response_rx
            .await
            .map_err(|_| AppError::ControllerGone("controller task died".to_string()))
    }

    pub async fn dispatch(&self, command: Command) -> Result<Effect, AppError> {
        debug!("Sending {}", command.name());
        let (responder, response_rx) = oneshot::channel();
        self.request(
            ControllerCommand::Dispatch { command, responder },
            response_rx,
        )
        .await?
    }

    pub fn view(&self) -> watch::Receiver<ViewState> {
        self.view.clone()
    }

    pub fn snapshot(&self) -> ViewState {
        self.view.borrow().clone()
    }

    /// Waits until no analysis is pending and returns the view at that point.
    pub async fn analysis_settled(&self) -> Result<ViewState, AppError> {
        let mut view = self.view.clone();
        let settled = view
            .wait_for(|view| !view.loading)
            .await
            .map_err(|_| AppError::ControllerGone("view channel closed".to_string()))?;
        Ok(settled.clone())
    }

    pub async fn notifications(&self) -> Result<Vec<Notification>, AppError> {
        let (responder, response_rx) = oneshot::channel();
        self.request(ControllerCommand::Notifications { responder }, response_rx)
            .await
    }

    pub async fn subscribe_notifications(
        &self,
    ) -> Result<broadcast::Receiver<Notification>, AppError> {
        let (responder, response_rx) = oneshot::channel();
        self.request(
            ControllerCommand::SubscribeNotifications { responder },
            response_rx,
        )
        .await
    }

    pub async fn shutdown(&self) -> Result<(), AppError> {
        let (responder, response_rx) = oneshot::channel();
        self.request(ControllerCommand::Shutdown { responder }, response_rx)
            .await
    }
}

/// Runs commands against the controller one at a time. Analysis requests and
/// the readiness probe run in their own tasks and report back through
/// `completion_tx`.
struct ControllerSupervisor {
    controller: DetectionController,
    completion_tx: mpsc::Sender<Completion>,
}

impl ControllerSupervisor {
    fn spawn_model_probe(&self) {
        let backend = self.controller.backend();
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let status = probe_model(backend.as_ref()).await;
            let _ = completion_tx.send(Completion::ModelStatus(status)).await;
        });
    }

    fn spawn_analysis(&mut self) -> Result<Effect, AppError> {
        let pending = self.controller.begin_analysis()?;
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = pending.run().await;
            if completion_tx
                .send(Completion::Analysis(result))
                .await
                .is_err()
            {
                error!("Controller gone before analysis finished");
            }
        });
        Ok(Effect::AnalysisStarted)
    }

    async fn dispatch(&mut self, command: Command) -> Result<Effect, AppError> {
        match self.controller.resolve(command) {
            Some(Command::Analyze) => self.spawn_analysis(),
            Some(command) => self.controller.dispatch(command).await,
            None => Ok(Effect::None),
        }
    }

    /// Returns `false` once the loop should end.
    async fn handle_command(&mut self, command: ControllerCommand) -> bool {
        match command {
            ControllerCommand::Dispatch { command, responder } => {
                let effect = self.dispatch(command).await;
                let _ = responder.send(effect);
                true
            }
            ControllerCommand::Notifications { responder } => {
                let _ = responder.send(self.controller.notifications().active());
                true
            }
            ControllerCommand::SubscribeNotifications { responder } => {
                let _ = responder.send(self.controller.notifications().subscribe());
                true
            }
            ControllerCommand::Shutdown { responder } => {
                self.controller.teardown();
                let _ = responder.send(());
                false
            }
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Analysis(result) => {
                // Failures are already surfaced as notifications.
                if let Ok(rendered) = self.controller.finish_analysis(result) {
                    info!("Analysis result: {}", rendered.diagnosis);
                }
            }
            Completion::ModelStatus(status) => self.controller.apply_model_status(status),
        }
    }
}

pub struct Coordinator {
    controller_task: JoinHandle<()>,
    handle: ControllerHandle,
}

impl Coordinator {
    fn new(configuration: Configuration, controller: DetectionController) -> Self {
        let (command_tx, command_rx) = mpsc::channel(configuration.command_buffer_size);
        let handle = ControllerHandle {
            command_tx,
            view: controller.view(),
        };
        Self {
            controller_task: Self::start_controller_task(configuration, controller, command_rx),
            handle,
        }
    }

    fn start_controller_task(
        configuration: Configuration,
        controller: DetectionController,
        mut command_rx: mpsc::Receiver<ControllerCommand>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let (completion_tx, mut completion_rx) =
                mpsc::channel(configuration.command_buffer_size);
            let mut supervisor = ControllerSupervisor {
                controller,
                completion_tx,
            };
            supervisor.spawn_model_probe();

            loop {
                tokio::select! {
                    command = command_rx.recv() => match command {
                        Some(command) => {
                            if !supervisor.handle_command(command).await {
                                break;
                            }
                        }
                        None => {
                            debug!("All controller handles dropped");
                            supervisor.controller.teardown();
                            break;
                        }
                    },
                    Some(completion) = completion_rx.recv() => {
                        supervisor.handle_completion(completion);
                    }
                }
            }
            info!("Controller task finished");
        })
    }

    pub fn handle(&self) -> ControllerHandle {
        self.handle.clone()
    }

    /// Tears the controller down, releasing the camera, and waits for its
    /// task to end.
    pub async fn shutdown(mut self) -> Result<(), AppError> {
        self.handle.shutdown().await?;
        if let Err(e) = (&mut self.controller_task).await {
            error!("Controller task failed: {}", e);
        }
        Ok(())
    }

    pub fn stop(&self) {
        self.controller_task.abort();
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct CoordinatorBuilder {
    configuration: Configuration,
    device: Option<Arc<dyn CameraDevice>>,
    backend: Option<Arc<dyn AnalysisBackend>>,
}

impl CoordinatorBuilder {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            device: None,
            backend: None,
        }
    }

    // Sets the backend base URL, this will override the default configuration.
    pub fn backend_url(mut self, backend_url: String) -> Self {
        self.configuration.backend_url = backend_url;
        self
    }

    // Chooses the endpoint for uploaded files, this will override the default configuration.
    pub fn file_route(mut self, file_route: FileRoute) -> Self {
        self.configuration.file_route = file_route;
        self
    }

    // Adjusts the JPEG quality of camera stills, this will override the default configuration.
    pub fn jpeg_quality(mut self, jpeg_quality: u8) -> Self {
        self.configuration.jpeg_quality = jpeg_quality;
        self
    }

    pub fn device(mut self, device: Arc<dyn CameraDevice>) -> Self {
        self.device = Some(device);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn AnalysisBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> Result<Coordinator, AppError> {
        self.configuration.validate()?;
        let device = self.device.unwrap_or_else(|| Arc::new(NoCamera));
        let backend = match self.backend {
            Some(backend) => backend,
            None => Arc::new(HttpBackend::new(
                &self.configuration.backend_url,
                self.configuration.request_timeout(),
            )?),
        };
        let controller = DetectionController::new(&self.configuration, device, backend);
        Ok(Coordinator::new(self.configuration, controller))
    }
}
