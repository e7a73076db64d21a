use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Statistics about a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: Uuid,

    /// Whether recording is currently active
    pub is_recording: bool,

    /// When the recording started
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Number of encoded chunks received so far
    pub chunks_count: usize,

    /// Size of the finalized artifact, once the session has stopped
    pub artifact_bytes: Option<usize>,
}

impl SessionStats {
    pub fn new(
        session_id: Uuid,
        is_recording: bool,
        started_at: DateTime<Utc>,
        chunks_count: usize,
        artifact_bytes: Option<usize>,
    ) -> Self {
        let duration = Utc::now().signed_duration_since(started_at);

        Self {
            session_id,
            is_recording,
            started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            chunks_count,
            artifact_bytes,
        }
    }
}
