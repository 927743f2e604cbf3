use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::{
    backend::{AnalysisBackend, PREDICT_ENDPOINT, TEST_MODEL_ENDPOINT, UPLOAD_ENDPOINT},
    wire::{ModelStatusResponse, PredictRequest, PredictionResponse},
};
use crate::error::BackendError;

/// [`AnalysisBackend`] over HTTP. No automatic retries.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(BackendError::Client)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

async fn decode<T: DeserializeOwned>(
    endpoint: &'static str,
    response: reqwest::Response,
) -> Result<T, BackendError> {
    let status = response.status();
    if !status.is_success() {
        return Err(BackendError::Status {
            endpoint,
            status: status.as_u16(),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|source| BackendError::Transport { endpoint, source })?;
    serde_json::from_slice(&body).map_err(|e| BackendError::Decode {
        endpoint,
        message: e.to_string(),
    })
}

const FALLBACK_MIME: &str = "application/octet-stream";

/// The multipart `file` part. A MIME type that does not parse is sent as
/// `application/octet-stream`.
fn file_part(file_name: &str, mime: &str, bytes: Vec<u8>) -> Result<Part, BackendError> {
    let mime = if Part::bytes(Vec::new()).mime_str(mime).is_ok() {
        mime
    } else {
        warn!("Unparseable MIME type {:?}, sending {}", mime, FALLBACK_MIME);
        FALLBACK_MIME
    };
    Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str(mime)
        .map_err(|e| BackendError::Encode {
            endpoint: UPLOAD_ENDPOINT,
            message: e.to_string(),
        })
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn model_status(&self) -> Result<ModelStatusResponse, BackendError> {
        let response = self
            .client
            .get(self.url(TEST_MODEL_ENDPOINT))
            .send()
            .await
            .map_err(|source| BackendError::Transport {
                endpoint: TEST_MODEL_ENDPOINT,
                source,
            })?;
        decode(TEST_MODEL_ENDPOINT, response).await
    }

    #[instrument(skip(self, image_data), fields(base_url = %self.base_url, len = image_data.len()))]
    async fn predict(&self, image_data: &str) -> Result<PredictionResponse, BackendError> {
        debug!("Posting data URL to {}", PREDICT_ENDPOINT);
        let response = self
            .client
            .post(self.url(PREDICT_ENDPOINT))
            .json(&PredictRequest { image_data })
            .send()
            .await
            .map_err(|source| BackendError::Transport {
                endpoint: PREDICT_ENDPOINT,
                source,
            })?;
        decode(PREDICT_ENDPOINT, response).await
    }

    #[instrument(skip(self, bytes), fields(base_url = %self.base_url, len = bytes.len()))]
    async fn upload(
        &self,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<PredictionResponse, BackendError> {
        debug!("Uploading {} to {}", file_name, UPLOAD_ENDPOINT);
        let part = file_part(file_name, mime, bytes)?;
        let response = self
            .client
            .post(self.url(UPLOAD_ENDPOINT))
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .map_err(|source| BackendError::Transport {
                endpoint: UPLOAD_ENDPOINT,
                source,
            })?;
        decode(UPLOAD_ENDPOINT, response).await
    }
}
