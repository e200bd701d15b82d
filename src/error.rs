use thiserror::Error;

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid request: {0}")]
    ValidationError(String),
    #[error("Image generation failed: {message}")]
    GenerationError {
        message: String,
        status: Option<u16>,
    },
    #[error("Provider error: {0}")]
    TransportError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl StudioError {
    pub fn validation(message: impl Into<String>) -> Self {
        StudioError::ValidationError(message.into())
    }

    pub fn generation(message: impl Into<String>) -> Self {
        StudioError::GenerationError {
            message: message.into(),
            status: None,
        }
    }

    pub fn fetch_failed(url: &str, status: u16) -> Self {
        StudioError::GenerationError {
            message: format!("fetch failed for {} (status {})", url, status),
            status: Some(status),
        }
    }

    pub fn from_provider_body(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.get("detail")
                    .or_else(|| v.get("error"))
                    .and_then(|d| d.as_str())
                    .map(String::from)
            })
            .filter(|d| !d.trim().is_empty());

        match detail {
            Some(detail) => StudioError::TransportError(detail),
            None if body.trim().is_empty() => {
                StudioError::TransportError(format!("provider responded with status {}", status))
            }
            None => StudioError::TransportError(format!("status {}: {}", status, body.trim())),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, StudioError::ValidationError(_))
    }
}

impl From<serde_json::Error> for StudioError {
    fn from(e: serde_json::Error) -> Self {
        StudioError::SerializationError(e.to_string())
    }
}

impl From<reqwest::Error> for StudioError {
    fn from(e: reqwest::Error) -> Self {
        StudioError::TransportError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;
