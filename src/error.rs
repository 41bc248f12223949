//! Error types for the franklin daemon

use thiserror::Error;

/// Result type alias for daemon operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the behavior engine and its collaborators
#[derive(Debug, Error)]
pub enum Error {
    /// Camera could not be opened or a frame could not be read
    #[error("sensor unavailable: {0}")]
    SensorUnavailable(String),

    /// Transcription returned an error or produced no text
    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    /// Missing or malformed animation data, bad settings
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Wakeword listener could not be brought back after a command capture
    #[error("wakeword detector failed to restart: {0}")]
    DetectorRestartFailed(String),

    /// Wakeword detector start/stop failure
    #[error("wakeword detector error: {0}")]
    Detector(String),

    /// Audio recording failure
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Errors that must stop the daemon instead of degrading it
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Configuration(_) | Error::DetectorRestartFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_taxonomy() {
        assert!(Error::Configuration("no idle animation".into()).is_fatal());
        assert!(Error::DetectorRestartFailed("spawn failed".into()).is_fatal());
        assert!(!Error::SensorUnavailable("camera gone".into()).is_fatal());
        assert!(!Error::TranscriptionFailed("empty".into()).is_fatal());
    }

    #[test]
    fn test_display() {
        let err = Error::SensorUnavailable("no frame".into());
        assert_eq!(err.to_string(), "sensor unavailable: no frame");
    }
}
