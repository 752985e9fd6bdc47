//! Error types shared across Captioneer crates.

use std::path::PathBuf;

/// Top-level error type for Captioneer operations.
#[derive(Debug, thiserror::Error)]
pub enum CaptioneerError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Audio error: {message}")]
    Audio { message: String },

    #[error("Transcription error: {message}")]
    Transcription { message: String },

    #[error("Font error: {message}")]
    Font { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using CaptioneerError.
pub type CaptioneerResult<T> = Result<T, CaptioneerError>;

impl CaptioneerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio {
            message: msg.into(),
        }
    }

    pub fn transcription(msg: impl Into<String>) -> Self {
        Self::Transcription {
            message: msg.into(),
        }
    }

    pub fn font(msg: impl Into<String>) -> Self {
        Self::Font {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Convenience for a missing input path.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = CaptioneerError::transcription("whisper exited with status 1");
        assert_eq!(
            err.to_string(),
            "Transcription error: whisper exited with status 1"
        );

        let err = CaptioneerError::file_not_found("/tmp/missing.mp4");
        assert_eq!(err.to_string(), "File not found: /tmp/missing.mp4");
    }

    #[test]
    fn test_io_error_converts() {
        fn fails() -> CaptioneerResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(CaptioneerError::Io(_))));
    }
}
