use thiserror::Error;

/// Application-wide error types for sieve.
#[derive(Error, Debug)]
pub enum AppError {
    /// Caller input rejected before any queue interaction (e.g. a non-http(s) URL).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The rendering collaborator could not load the page for a strategy.
    #[error("Render error: {0}")]
    RenderError(String),

    /// HTTP request failed (plain fetch renderer).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Markup could not be turned into an extraction candidate.
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// The queue backend rejected or failed a command.
    #[error("Queue error: {0}")]
    QueueError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Operation timed out.
    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    /// Returns true for transport failures (queue backend unreachable),
    /// as opposed to crawl-logic or caller errors.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, AppError::QueueError(_) | AppError::NetworkError(_))
    }

    /// Returns true if the error came from loading a page rather than
    /// from our own processing of it.
    pub fn is_render_failure(&self) -> bool {
        match self {
            AppError::RenderError(_) | AppError::Timeout(_) | AppError::NetworkError(_) => true,
            AppError::HttpError(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infrastructure_errors() {
        assert!(AppError::QueueError("connection refused".into()).is_infrastructure());
        assert!(AppError::NetworkError("reset".into()).is_infrastructure());
        assert!(!AppError::ValidationError("ftp://bad".into()).is_infrastructure());
        assert!(!AppError::RenderError("navigation failed".into()).is_infrastructure());
    }

    #[test]
    fn test_render_failures() {
        assert!(AppError::RenderError("net::ERR_NAME_NOT_RESOLVED".into()).is_render_failure());
        assert!(AppError::Timeout(30).is_render_failure());
        assert!(AppError::HttpError("HTTP 503".into()).is_render_failure());
        assert!(!AppError::ExtractionError("bad selector".into()).is_render_failure());
        assert!(!AppError::QueueError("down".into()).is_render_failure());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            AppError::ValidationError("URL must start with http:// or https://".into())
                .to_string(),
            "Validation error: URL must start with http:// or https://"
        );
        assert_eq!(AppError::Timeout(60).to_string(), "Timed out after 60 seconds");
    }
}
