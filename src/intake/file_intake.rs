use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::captured_image::CapturedImage;
use crate::error::IntakeError;

/// How the file reached us. Both origins go through [`FileIntake::accept`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOrigin {
    Browse,
    Drop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContents {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

/// A file handed over by a picker or a drop target, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub mime: String,
    pub size: u64,
    pub contents: FileContents,
}

impl SelectedFile {
    pub fn from_bytes(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            size: bytes.len() as u64,
            contents: FileContents::Bytes(bytes),
        }
    }

    /// Describes a file on disk. The MIME type is guessed from the extension,
    /// the way a browser file picker reports it.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, IntakeError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| IntakeError::Unreadable {
                name: name.clone(),
                message: e.to_string(),
            })?;
        Ok(Self {
            name,
            mime: guess_mime(path),
            size: metadata.len(),
            contents: FileContents::Path(path.to_path_buf()),
        })
    }
}

pub fn guess_mime(path: &Path) -> String {
    image::ImageFormat::from_path(path)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| "application/octet-stream".to_string())
}

#[derive(Debug, Clone)]
pub struct FileIntake {
    max_bytes: u64,
}

impl FileIntake {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn validate(&self, file: &SelectedFile) -> Result<(), IntakeError> {
        if !file.mime.starts_with("image/") {
            return Err(IntakeError::InvalidType {
                mime: file.mime.clone(),
            });
        }
        if file.size > self.max_bytes {
            return Err(IntakeError::TooLarge {
                size: file.size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Validates the first of `files` and decodes it into a [`CapturedImage`].
    /// An empty selection yields `Ok(None)`.
    pub async fn accept(
        &self,
        origin: FileOrigin,
        files: Vec<SelectedFile>,
    ) -> Result<Option<CapturedImage>, IntakeError> {
        let Some(file) = files.into_iter().next() else {
            debug!("Ignoring empty {:?} selection", origin);
            return Ok(None);
        };

        if let Err(e) = self.validate(&file) {
            warn!("Rejected {} from {:?}: {}", file.name, origin, e);
            return Err(e);
        }

        let bytes = match file.contents {
            FileContents::Bytes(bytes) => bytes,
            FileContents::Path(path) => {
                tokio::fs::read(&path)
                    .await
                    .map_err(|e| IntakeError::Unreadable {
                        name: file.name.clone(),
                        message: e.to_string(),
                    })?
            }
        };

        // The declared size can be stale by the time the bytes are read.
        if bytes.len() as u64 > self.max_bytes {
            return Err(IntakeError::TooLarge {
                size: bytes.len() as u64,
                limit: self.max_bytes,
            });
        }

        info!(
            "Accepted {} ({}, {} bytes) from {:?}",
            file.name,
            file.mime,
            bytes.len(),
            origin
        );
        Ok(Some(CapturedImage::from_file(file.name, file.mime, bytes)))
    }
}
