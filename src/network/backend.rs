use async_trait::async_trait;

use super::wire::{ModelStatusResponse, PredictionResponse};
use crate::error::BackendError;

pub const TEST_MODEL_ENDPOINT: &str = "/test-model";
pub const PREDICT_ENDPOINT: &str = "/predict";
pub const UPLOAD_ENDPOINT: &str = "/upload";

/// The inference service. Responses carrying an `error` field are still
/// `Ok` here; interpreting them is the submitter's job.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn model_status(&self) -> Result<ModelStatusResponse, BackendError>;

    /// `POST /predict` with a data URL.
    async fn predict(&self, image_data: &str) -> Result<PredictionResponse, BackendError>;

    /// `POST /upload` with the original file as multipart field `file`.
    async fn upload(
        &self,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<PredictionResponse, BackendError>;
}
