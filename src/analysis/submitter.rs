use std::{
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use futures::FutureExt;
use tracing::{debug, error, info, instrument, warn};

use super::presenter::AnalysisResult;
use crate::{
    config::FileRoute,
    error::SubmitError,
    intake::{CapturedImage, ImagePayload},
    network::{AnalysisBackend, PredictionResponse},
};

const DEFAULT_DIAGNOSIS: &str = "Analysis complete";

/// Snapshot of the image payload, serialized for its route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisRequest {
    Predict {
        image_data: String,
    },
    Upload {
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

impl AnalysisRequest {
    pub fn for_image(image: &CapturedImage, file_route: FileRoute) -> Self {
        match (&image.payload, file_route) {
            (ImagePayload::Encoded { data_url }, _) => AnalysisRequest::Predict {
                image_data: data_url.clone(),
            },
            (ImagePayload::File { .. }, FileRoute::Predict) => AnalysisRequest::Predict {
                image_data: image.preview().to_string(),
            },
            (ImagePayload::File { name, mime, bytes }, FileRoute::Upload) => {
                AnalysisRequest::Upload {
                    file_name: name.clone(),
                    mime: mime.clone(),
                    bytes: bytes.clone(),
                }
            }
        }
    }
}

impl PredictionResponse {
    pub fn into_result(self) -> Result<AnalysisResult, SubmitError> {
        if let Some(message) = self.error.filter(|message| !message.is_empty()) {
            return Err(SubmitError::Analysis(message));
        }
        Ok(AnalysisResult {
            diagnosis: self
                .diagnosis
                .filter(|diagnosis| !diagnosis.is_empty())
                .unwrap_or_else(|| DEFAULT_DIAGNOSIS.to_string()),
            confidence: self.confidence,
            prediction_value: self.prediction_value,
            note: self.note,
        })
    }
}

/// Clears the in-flight flag on every exit path, unwinding included.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Sends the current image to the backend, one request at a time.
#[derive(Clone)]
pub struct AnalysisSubmitter {
    backend: Arc<dyn AnalysisBackend>,
    file_route: FileRoute,
    in_flight: Arc<AtomicBool>,
}

impl AnalysisSubmitter {
    pub fn new(backend: Arc<dyn AnalysisBackend>, file_route: FileRoute) -> Self {
        Self {
            backend,
            file_route,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Snapshots `image` and reserves the single request slot. Nothing is
    /// sent until [`PendingAnalysis::run`].
    pub fn begin(&self, image: Option<&CapturedImage>) -> Result<PendingAnalysis, SubmitError> {
        let Some(image) = image else {
            return Err(SubmitError::NoImageSelected);
        };
        if self.in_flight.swap(true, Ordering::AcqRel) {
            warn!("Analysis requested while one is in flight");
            return Err(SubmitError::InFlight);
        }

        debug!("Submitting image {} ({:?})", image.id, image.source);
        Ok(PendingAnalysis {
            backend: self.backend.clone(),
            request: AnalysisRequest::for_image(image, self.file_route),
            _guard: InFlightGuard(self.in_flight.clone()),
        })
    }
}

pub struct PendingAnalysis {
    backend: Arc<dyn AnalysisBackend>,
    request: AnalysisRequest,
    _guard: InFlightGuard,
}

impl PendingAnalysis {
    pub fn request(&self) -> &AnalysisRequest {
        &self.request
    }

    /// Performs the request. A panic inside the backend is reported as a
    /// network failure instead of unwinding into the caller.
    #[instrument(skip(self))]
    pub async fn run(self) -> Result<AnalysisResult, SubmitError> {
        match AssertUnwindSafe(self.execute()).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                error!("Analysis request panicked");
                Err(SubmitError::Network("analysis request aborted".to_string()))
            }
        }
    }

    async fn execute(self) -> Result<AnalysisResult, SubmitError> {
        let response = match &self.request {
            AnalysisRequest::Predict { image_data } => self.backend.predict(image_data).await,
            AnalysisRequest::Upload {
                file_name,
                mime,
                bytes,
            } => {
                self.backend
                    .upload(file_name, mime, bytes.clone())
                    .await
            }
        };

        let response = response.map_err(|e| {
            error!("Analysis request failed: {}", e);
            SubmitError::Network(e.to_string())
        })?;

        let result = response.into_result();
        match &result {
            Ok(result) => info!("Analysis finished: {}", result.diagnosis),
            Err(e) => warn!("Backend reported an error: {}", e),
        }
        result
    }
}
