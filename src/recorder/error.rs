use thiserror::Error;

use crate::audio::CaptureError;

/// Failures of user-triggered recorder actions
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Audio input refused or unavailable; recording did not start
    #[error("cannot access audio input: {0}")]
    PermissionDenied(#[source] CaptureError),

    #[error("a recording is already in progress")]
    AlreadyRecording,

    /// Upload attempted before anything was recorded
    #[error("no recorded audio to upload")]
    NoArtifact,

    /// Upload request failed or was rejected; the artifact is kept for a manual retry
    #[error("upload failed: {0}")]
    TransportFailure(String),

    #[error("capture failed: {0}")]
    Capture(#[source] CaptureError),
}

impl RecorderError {
    /// Actionable message for the person operating the recorder
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied(e) => format!(
                "Could not access the microphone ({}). Check that an input device is connected and that access is allowed, then try again.",
                e
            ),
            Self::AlreadyRecording => {
                "A recording is already in progress. Stop it before starting a new one.".to_string()
            }
            Self::NoArtifact => "No recorded audio! Record something before uploading.".to_string(),
            Self::TransportFailure(reason) => format!(
                "Uploading the recording failed ({}). The recording is still available; try uploading again.",
                reason
            ),
            Self::Capture(e) => format!("Recording failed ({}). Try recording again.", e),
        }
    }
}

impl From<CaptureError> for RecorderError {
    fn from(e: CaptureError) -> Self {
        match e {
            CaptureError::PermissionDenied(_) | CaptureError::NoInputDevice(_) => {
                Self::PermissionDenied(e)
            }
            other => Self::Capture(other),
        }
    }
}

impl From<reqwest::Error> for RecorderError {
    fn from(e: reqwest::Error) -> Self {
        Self::TransportFailure(e.to_string())
    }
}
