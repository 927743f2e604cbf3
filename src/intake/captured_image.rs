use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    FileUpload,
    CameraCapture,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    /// Original file bytes, sent untouched on upload.
    File {
        name: String,
        mime: String,
        bytes: Vec<u8>,
    },
    /// JPEG still frame as a `data:image/jpeg;base64,...` URL.
    Encoded { data_url: String },
}

/// The single image awaiting analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub id: Uuid,
    pub source: ImageSource,
    pub payload: ImagePayload,
    pub acquired_at: DateTime<Utc>,
    preview: String,
}

impl CapturedImage {
    pub fn from_file(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        let mime = mime.into();
        let preview = data_url(&mime, &bytes);
        Self {
            id: Uuid::new_v4(),
            source: ImageSource::FileUpload,
            payload: ImagePayload::File {
                name: name.into(),
                mime,
                bytes,
            },
            acquired_at: Utc::now(),
            preview,
        }
    }

    pub fn from_jpeg(jpeg: &[u8]) -> Self {
        let data_url = data_url("image/jpeg", jpeg);
        Self {
            id: Uuid::new_v4(),
            source: ImageSource::CameraCapture,
            payload: ImagePayload::Encoded {
                data_url: data_url.clone(),
            },
            acquired_at: Utc::now(),
            preview: data_url,
        }
    }

    /// Data URL suitable for showing the image in a preview.
    pub fn preview(&self) -> &str {
        &self.preview
    }
}

pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}
