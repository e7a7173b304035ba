//! Error handling module for Seamcut

use thiserror::Error;

/// Main error type for Seamcut operations
#[derive(Error, Debug)]
pub enum SeamcutError {
    /// Segment bound ordering violated; the edit is rejected and state is unchanged
    #[error("Invalid range: {message}")]
    InvalidRange { message: String },

    /// Invert / fill-gaps preconditions are not met
    #[error("Segments overlap or are invalid; cannot compute gaps")]
    OverlapDetected,

    /// No segment contains the requested time
    #[error("No segment found at {time:.3}s")]
    NoSegmentAtCursor { time: f64 },

    /// A keyframe could not be located inside the bounded search window
    #[error("No keyframe found near {time:.3}s within {window:.1}s")]
    KeyframeSearchFailed { time: f64, window: f64 },

    /// Smart cut was required but cannot be performed safely
    #[error("Smart cut not supported: {reason}")]
    SmartCutUnsupported { reason: String },

    /// The external tool could not be spawned or exited with a failure status
    #[error("{program} failed (exit code {exit_code:?}): {log_tail}")]
    ExternalToolFailure {
        program: String,
        exit_code: Option<i32>,
        log_tail: String,
    },

    /// Explicit cooperative cancellation; not a failure
    #[error("Operation cancelled")]
    Cancelled,

    /// The media duration is required but not known yet
    #[error("Media duration is unknown")]
    DurationUnknown,

    /// Probe output could not be obtained or understood
    #[error("Failed to probe media file: {message}")]
    Probe { message: String },

    /// Invalid time format
    #[error("Invalid time format: {time}. Expected HH:MM:SS.ms, MM:SS.ms, or seconds")]
    InvalidTimeFormat { time: String },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (project file / probe output) error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SeamcutError {
    /// Shorthand for an [`SeamcutError::InvalidRange`]
    pub fn invalid_range(message: impl Into<String>) -> Self {
        SeamcutError::InvalidRange {
            message: message.into(),
        }
    }

    /// Whether this outcome is a user-initiated cancellation that should not
    /// be reported as a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, SeamcutError::Cancelled)
    }
}

/// Result type alias for Seamcut operations
pub type SeamcutResult<T> = std::result::Result<T, SeamcutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_is_distinguishable() {
        assert!(SeamcutError::Cancelled.is_cancellation());
        assert!(!SeamcutError::OverlapDetected.is_cancellation());
    }

    #[test]
    fn test_tool_failure_message_includes_log_tail() {
        let err = SeamcutError::ExternalToolFailure {
            program: "ffmpeg".to_string(),
            exit_code: Some(1),
            log_tail: "Invalid data found when processing input".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("ffmpeg"));
        assert!(message.contains("Invalid data found"));
    }
}
