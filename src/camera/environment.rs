use std::fmt;

/// What the hosting environment exposes for camera access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub capture_api_available: bool,
    pub scheme: String,
    pub host: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    InsecureContext,
    ApiMissing,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::InsecureContext => write!(f, "Camera requires HTTPS connection"),
            UnavailableReason::ApiMissing => write!(f, "Camera not supported in this browser"),
        }
    }
}

impl Environment {
    pub fn new(capture_api_available: bool, scheme: &str, host: &str) -> Self {
        Self {
            capture_api_available,
            scheme: scheme.to_ascii_lowercase(),
            host: host.to_ascii_lowercase(),
        }
    }

    /// A local process talking to a device directly.
    pub fn local() -> Self {
        Self::new(true, "https", "localhost")
    }

    pub fn is_secure_context(&self) -> bool {
        self.scheme == "https" || self.host == "localhost" || self.host == "127.0.0.1"
    }

    pub fn check(&self) -> Result<(), UnavailableReason> {
        if !self.is_secure_context() {
            return Err(UnavailableReason::InsecureContext);
        }
        if !self.capture_api_available {
            return Err(UnavailableReason::ApiMissing);
        }
        Ok(())
    }
}
