use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "skinscan";
pub const ENV_PREFIX: &str = "SKINSCAN";

/// Which endpoint receives images that came from a file upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRoute {
    /// Multipart form with a `file` field to `/upload`.
    Upload,
    /// Data URL in a JSON body to `/predict`, same as camera captures.
    Predict,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub backend_url: String,
    pub request_timeout_secs: u64,
    pub max_upload_bytes: u64,
    pub jpeg_quality: u8,
    pub notification_lifetime_ms: u64,
    pub file_route: FileRoute,
    pub log_level: String,
    pub command_buffer_size: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:5000".to_string(),
            request_timeout_secs: 60,
            max_upload_bytes: 10 * 1024 * 1024,
            jpeg_quality: 80,
            notification_lifetime_ms: 5000,
            file_route: FileRoute::Upload,
            log_level: "info".to_string(),
            command_buffer_size: 32,
        }
    }
}

impl Configuration {
    /// Layers defaults, an optional `skinscan.{toml,json,yaml}` file and
    /// `SKINSCAN__*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    pub fn load_from(file_stem: &str) -> Result<Self, ConfigError> {
        let configuration: Configuration = config::Config::builder()
            .add_source(config::File::with_name(file_stem).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn notification_lifetime(&self) -> Duration {
        Duration::from_millis(self.notification_lifetime_ms)
    }

    pub fn tracing_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend_url.trim().is_empty() {
            return Err(ConfigError::Invalid("Backend URL must not be empty".to_string()));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "Max upload size must be greater than 0".to_string(),
            ));
        }

        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(ConfigError::Invalid(
                "JPEG quality must be between 1 and 100".to_string(),
            ));
        }

        if self.command_buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "Command buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
